//! API key management endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Envelope;
use crate::client::ApiClient;
use crate::error::{ApiError, AppError};

/// An API key. The `key` secret is only present in create and rotate
/// responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub revoked: bool,
}

/// Fields for creating an API key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApiKey {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Partial update for an API key. Absent fields are left unchanged.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeysData {
    keys: Vec<ApiKey>,
}

#[derive(Debug, Deserialize)]
struct KeyData {
    key: ApiKey,
}

pub struct KeysApi<'c> {
    pub(crate) client: &'c ApiClient,
}

impl KeysApi<'_> {
    pub async fn list(&self) -> Result<Vec<ApiKey>, AppError> {
        let envelope: Envelope<KeysData> = self.client.get("/api-keys").await?;
        Ok(envelope.into_data()?.keys)
    }

    /// Usage statistics, passed through untyped.
    pub async fn stats(&self) -> Result<Value, AppError> {
        let envelope: Envelope<Value> = self.client.get("/api-keys/stats").await?;
        envelope.into_data().map_err(AppError::from)
    }

    pub async fn get(&self, id: &str) -> Result<ApiKey, AppError> {
        let envelope: Envelope<KeyData> =
            self.client.get(&format!("/api-keys/{}", id)).await?;
        Ok(envelope.into_data()?.key)
    }

    pub async fn create(&self, key: &NewApiKey) -> Result<ApiKey, AppError> {
        let body = serde_json::to_value(key).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
        let envelope: Envelope<KeyData> = self.client.post("/api-keys", body).await?;
        Ok(envelope.into_data()?.key)
    }

    pub async fn update(&self, id: &str, update: &ApiKeyUpdate) -> Result<ApiKey, AppError> {
        let body =
            serde_json::to_value(update).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
        let envelope: Envelope<KeyData> =
            self.client.put(&format!("/api-keys/{}", id), body).await?;
        Ok(envelope.into_data()?.key)
    }

    pub async fn delete(&self, id: &str) -> Result<String, AppError> {
        let envelope: Envelope<Value> =
            self.client.delete(&format!("/api-keys/{}", id)).await?;
        envelope.into_ack().map_err(AppError::from)
    }

    /// Regenerate the key secret. The response carries the new secret.
    pub async fn rotate(&self, id: &str) -> Result<ApiKey, AppError> {
        let envelope: Envelope<KeyData> = self
            .client
            .post(&format!("/api-keys/{}/rotate", id), serde_json::json!({}))
            .await?;
        Ok(envelope.into_data()?.key)
    }

    pub async fn revoke(&self, id: &str) -> Result<String, AppError> {
        let envelope: Envelope<Value> = self
            .client
            .post(&format!("/api-keys/{}/revoke", id), serde_json::json!({}))
            .await?;
        envelope.into_ack().map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_secret_absent_on_list() {
        let key: ApiKey = serde_json::from_str(
            r#"{"id":"k1","name":"ci","permissions":["read"]}"#,
        )
        .unwrap();
        assert!(key.key.is_none());
        assert!(!key.revoked);
    }

    #[test]
    fn test_new_key_skips_absent_expiry() {
        let key = NewApiKey {
            name: "ci".into(),
            description: "pipeline".into(),
            permissions: vec!["read".into()],
            expires_at: None,
        };
        let value = serde_json::to_value(&key).unwrap();
        assert!(value.get("expiresAt").is_none());
    }
}
