//! Authenticated HTTP client for the SuaTalk API.
//!
//! Attaches bearer tokens to outbound requests and recovers from access-token
//! expiry: the first request to see a 401 performs the refresh exchange while
//! every other 401 parks on a queue, then all of them replay with the new
//! token. Login and refresh calls themselves are never intercepted.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use reqwest::multipart::Form;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, AppError, AuthError};
use crate::session::{Session, Tokens, UnauthorizedAction};

/// HTTP request timeout.
const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Auth endpoints carry no bearer token and are never routed through the
/// refresh protocol, so a failing refresh cannot recurse into itself.
fn is_auth_endpoint(endpoint: &str) -> bool {
    endpoint.contains("/auth/login") || endpoint.contains("/auth/refresh-token")
}

/// Request body. Multipart parts hold their bytes so a queued request can
/// rebuild its form when it is replayed after a refresh.
#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(Vec<Part>),
}

/// One part of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub kind: PartKind,
}

#[derive(Debug, Clone)]
pub enum PartKind {
    Text(String),
    Bytes {
        data: Arc<Vec<u8>>,
        file_name: String,
        mime: String,
    },
}

impl Part {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PartKind::Text(value.into()),
        }
    }

    pub fn bytes(
        name: impl Into<String>,
        data: Vec<u8>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: PartKind::Bytes {
                data: Arc::new(data),
                file_name: file_name.into(),
                mime: mime.into(),
            },
        }
    }
}

/// Successful response body: parsed JSON, or the raw text when the server
/// returns a non-JSON 2xx body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

/// Shape of the refresh endpoint response.
#[derive(Deserialize)]
struct RefreshEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<RefreshData>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct RefreshData {
    #[serde(default)]
    tokens: Option<Tokens>,
}

/// Authenticated API client.
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a new client against the configured base URL.
    pub fn new(config: &Config, session: Arc<Session>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// The session this client authenticates with.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Issue a request against `endpoint` (path relative to the base URL).
    ///
    /// On a 401 outside the auth endpoints, coordinates a single token
    /// refresh across all concurrent requests and replays this one once with
    /// the new token.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: &Body,
    ) -> Result<Payload, AppError> {
        let auth_exempt = is_auth_endpoint(endpoint);
        let token = if auth_exempt {
            None
        } else {
            self.session.access_token().map(|t| t.to_string())
        };

        let response = self
            .send(method.clone(), endpoint, body, token.as_deref())
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED && !auth_exempt {
            return self
                .recover_unauthorized(method, endpoint, body, token.as_deref())
                .await;
        }

        into_payload(response).await.map_err(AppError::from)
    }

    /// Issue a request and deserialize the JSON payload into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: &Body,
    ) -> Result<T, AppError> {
        match self.request(method, endpoint, body).await? {
            Payload::Json(value) => serde_json::from_value(value)
                .map_err(|e| AppError::Api(ApiError::ParseFailed(e.to_string()))),
            Payload::Text(text) => Err(AppError::Api(ApiError::ParseFailed(format!(
                "expected JSON response, got: {}",
                text
            )))),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, AppError> {
        self.request_json(Method::GET, endpoint, &Body::Empty).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<T, AppError> {
        self.request_json(Method::POST, endpoint, &Body::Json(body))
            .await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<T, AppError> {
        self.request_json(Method::PUT, endpoint, &Body::Json(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, AppError> {
        self.request_json(Method::DELETE, endpoint, &Body::Empty)
            .await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        parts: Vec<Part>,
    ) -> Result<T, AppError> {
        self.request_json(Method::POST, endpoint, &Body::Multipart(parts))
            .await
    }

    /// Handle a 401 on a non-auth endpoint.
    async fn recover_unauthorized(
        &self,
        method: Method,
        endpoint: &str,
        body: &Body,
        used_token: Option<&str>,
    ) -> Result<Payload, AppError> {
        debug!("401 on {} {}, entering refresh protocol", method, endpoint);

        match self.session.on_unauthorized(used_token) {
            UnauthorizedAction::Retry(token) => {
                debug!("Token already refreshed elsewhere, retrying {}", endpoint);
                self.retry_with(method, endpoint, body, &token).await
            }
            UnauthorizedAction::Wait(rx) => {
                let outcome = rx.await.map_err(|_| {
                    AuthError::RefreshFailed("refresh task dropped".to_string())
                })?;
                let token = outcome.map_err(AppError::from)?;
                self.retry_with(method, endpoint, body, &token).await
            }
            UnauthorizedAction::Lead => {
                let outcome = self.exchange_refresh_token().await;
                let token = self.session.finish_refresh(outcome)?;
                self.retry_with(method, endpoint, body, &token).await
            }
        }
    }

    /// Replay a request once with a fresh token. A second 401 is not
    /// intercepted again; it surfaces as a status error.
    async fn retry_with(
        &self,
        method: Method,
        endpoint: &str,
        body: &Body,
        token: &str,
    ) -> Result<Payload, AppError> {
        let response = self.send(method, endpoint, body, Some(token)).await?;
        into_payload(response).await.map_err(AppError::from)
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: &Body,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request = self
            .http
            .request(method, &url)
            .header("x-request-id", Uuid::new_v4().to_string());

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::Multipart(parts) => request.multipart(build_form(parts)?),
        };

        request.send().await.map_err(ApiError::Network)
    }

    /// Exchange the stored refresh token for a new pair and persist it.
    async fn exchange_refresh_token(&self) -> Result<String, AuthError> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or(AuthError::NoRefreshToken)?;

        info!("Refreshing access token");

        let url = format!("{}/auth/refresh-token", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-request-id", Uuid::new_v4().to_string())
            .json(&serde_json::json!({ "refreshToken": refresh_token.as_str() }))
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::RefreshFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let envelope: RefreshEnvelope = response
            .json()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        if !envelope.success {
            return Err(AuthError::RefreshFailed(
                envelope
                    .message
                    .unwrap_or_else(|| "refresh rejected".to_string()),
            ));
        }

        let tokens = envelope
            .data
            .and_then(|d| d.tokens)
            .ok_or_else(|| AuthError::RefreshFailed("invalid refresh response".to_string()))?;

        self.session
            .store_tokens(&tokens)
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        info!("Access token refreshed");
        Ok(tokens.access_token.clone())
    }
}

/// Map a response to a payload: non-2xx becomes a status error carrying the
/// body text, 2xx parses as JSON with a raw-text fallback.
async fn into_payload(response: Response) -> Result<Payload, ApiError> {
    let status = response.status();
    let text = response.text().await.map_err(ApiError::Network)?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    match serde_json::from_str(&text) {
        Ok(value) => Ok(Payload::Json(value)),
        Err(_) => Ok(Payload::Text(text)),
    }
}

fn build_form(parts: &[Part]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for part in parts {
        match &part.kind {
            PartKind::Text(value) => {
                form = form.text(part.name.clone(), value.clone());
            }
            PartKind::Bytes {
                data,
                file_name,
                mime,
            } => {
                let file_part = reqwest::multipart::Part::bytes(data.as_ref().clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|e| ApiError::InvalidBody(e.to_string()))?;
                form = form.part(part.name.clone(), file_part);
            }
        }
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_endpoints_exempt() {
        assert!(is_auth_endpoint("/auth/login"));
        assert!(is_auth_endpoint("/auth/refresh-token"));
        assert!(!is_auth_endpoint("/auth/logout"));
        assert!(!is_auth_endpoint("/babies"));
    }

    #[test]
    fn test_multipart_body_is_rebuildable() {
        let parts = vec![
            Part::bytes("audio", vec![1, 2, 3], "cry.wav", "audio/wav"),
            Part::text("type", "cry"),
        ];
        let body = Body::Multipart(parts);

        // Two independent forms from the same body, as a replay requires
        if let Body::Multipart(parts) = &body {
            assert!(build_form(parts).is_ok());
            assert!(build_form(parts).is_ok());
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_invalid_mime_is_rejected() {
        let parts = vec![Part::bytes("audio", vec![1], "cry.wav", "not a mime")];
        assert!(matches!(
            build_form(&parts),
            Err(ApiError::InvalidBody(_))
        ));
    }
}
