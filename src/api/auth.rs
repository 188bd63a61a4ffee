//! Authentication endpoints and credential lifecycle.
//!
//! Login and completed registration persist the issued token pair and the
//! signed-in user; logout revokes the refresh token and clears the store.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::Envelope;
use crate::client::{ApiClient, Payload};
use crate::error::{ApiError, AppError, AuthError};
use crate::session::Tokens;

/// Signed-in user as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default)]
    tokens: Option<Tokens>,
    #[serde(default)]
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct TokensData {
    #[serde(default)]
    tokens: Option<Tokens>,
}

/// Fields required to finish a registration started with an email code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRegistration {
    pub email: String,
    pub code: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

pub struct AuthApi<'c> {
    pub(crate) client: &'c ApiClient,
}

impl AuthApi<'_> {
    /// Backend health probe. Returns the raw payload since the health
    /// endpoint does not use the response envelope.
    pub async fn health(&self) -> Result<Payload, AppError> {
        self.client
            .request(reqwest::Method::GET, "/health", &crate::client::Body::Empty)
            .await
    }

    /// Sign in with email and password, persisting the issued credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, AppError> {
        // Drop any previous session before signing in
        self.client.session().clear_credentials()?;

        let envelope: Envelope<LoginData> = self
            .client
            .post("/auth/login", json!({ "email": email, "password": password }))
            .await?;

        let user = self.persist_login(envelope)?;
        info!("Signed in as {}", user.email);
        Ok(user)
    }

    /// Finish a code-verified registration, persisting the issued credentials.
    pub async fn complete_registration(
        &self,
        registration: &CompleteRegistration,
    ) -> Result<AuthUser, AppError> {
        let body = serde_json::to_value(registration)
            .map_err(|e| ApiError::InvalidBody(e.to_string()))?;

        let envelope: Envelope<LoginData> = self
            .client
            .post("/auth/complete-registration", body)
            .await?;

        let user = self.persist_login(envelope)?;
        info!("Registration completed for {}", user.email);
        Ok(user)
    }

    fn persist_login(&self, envelope: Envelope<LoginData>) -> Result<AuthUser, AppError> {
        let data = envelope.into_data()?;
        let (tokens, user) = match (data.tokens, data.user) {
            (Some(tokens), Some(user)) => (tokens, user),
            _ => {
                return Err(AppError::Api(ApiError::ParseFailed(
                    "login response missing tokens or user".to_string(),
                )))
            }
        };

        let session = self.client.session();
        session.store_tokens(&tokens)?;
        let user_json =
            serde_json::to_string(&user).map_err(|e| ApiError::ParseFailed(e.to_string()))?;
        session.store_user(&user.id, &user_json)?;

        Ok(user)
    }

    /// Explicitly refresh the stored token pair.
    ///
    /// Used when restoring a session at startup. In-flight request recovery
    /// goes through the client's coordinated refresh instead.
    pub async fn refresh(&self) -> Result<(), AppError> {
        let refresh_token = self
            .client
            .session()
            .refresh_token()
            .ok_or(AuthError::NoRefreshToken)?;

        let envelope: Envelope<TokensData> = self
            .client
            .post(
                "/auth/refresh-token",
                json!({ "refreshToken": refresh_token.as_str() }),
            )
            .await?;

        let tokens = envelope.into_data()?.tokens.ok_or_else(|| {
            AppError::Auth(AuthError::RefreshFailed(
                "invalid refresh response".to_string(),
            ))
        })?;

        self.client.session().store_tokens(&tokens)?;
        info!("Session tokens refreshed");
        Ok(())
    }

    /// Sign out: revoke the refresh token server-side, then clear stored
    /// credentials. Revocation failure does not block the local sign-out.
    pub async fn logout(&self) -> Result<(), AppError> {
        if let Some(refresh_token) = self.client.session().refresh_token() {
            let result: Result<Envelope<serde_json::Value>, AppError> = self
                .client
                .post(
                    "/auth/logout",
                    json!({ "refreshToken": refresh_token.as_str() }),
                )
                .await;
            if let Err(e) = result {
                warn!("Logout request failed, clearing credentials anyway: {}", e);
            }
        }

        self.client.session().clear_credentials()?;
        info!("Signed out");
        Ok(())
    }

    pub async fn check_email(&self, email: &str) -> Result<String, AppError> {
        self.ack("/auth/check-email", json!({ "email": email }))
            .await
    }

    pub async fn confirm_email(&self, email: &str, code: &str) -> Result<String, AppError> {
        self.ack("/auth/confirm-email", json!({ "email": email, "code": code }))
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String, AppError> {
        self.ack("/auth/forgot-password", json!({ "email": email }))
            .await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<String, AppError> {
        self.ack(
            "/auth/reset-password",
            json!({ "token": token, "newPassword": new_password }),
        )
        .await
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<String, AppError> {
        self.ack(
            "/auth/change-password",
            json!({ "currentPassword": current_password, "newPassword": new_password }),
        )
        .await
    }

    pub async fn resend_verification(&self, email: &str) -> Result<String, AppError> {
        self.ack("/auth/resend-verification", json!({ "email": email }))
            .await
    }

    async fn ack(&self, endpoint: &str, body: serde_json::Value) -> Result<String, AppError> {
        let envelope: Envelope<serde_json::Value> = self.client.post(endpoint, body).await?;
        envelope.into_ack().map_err(AppError::from)
    }
}
