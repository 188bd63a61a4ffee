//! Typed endpoint groups for the SuaTalk API.
//!
//! Every group funnels through [`ApiClient::request`], so bearer attachment
//! and refresh coordination apply uniformly. Responses use the common
//! `{success, data, message}` envelope.

pub mod audio;
pub mod auth;
pub mod babies;
pub mod keys;
pub mod ml;
pub mod users;

use serde::Deserialize;

use crate::client::ApiClient;
use crate::error::ApiError;

/// The `{success, data, message}` response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload of a successful response.
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(
                self.message
                    .unwrap_or_else(|| "request rejected".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| ApiError::ParseFailed("response missing data".to_string()))
    }

    /// Unwrap an acknowledgement response, returning its message.
    pub fn into_ack(self) -> Result<String, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(
                self.message
                    .unwrap_or_else(|| "request rejected".to_string()),
            ));
        }
        Ok(self.message.unwrap_or_default())
    }
}

impl ApiClient {
    pub fn auth(&self) -> auth::AuthApi<'_> {
        auth::AuthApi { client: self }
    }

    pub fn babies(&self) -> babies::BabiesApi<'_> {
        babies::BabiesApi { client: self }
    }

    pub fn audio(&self) -> audio::AudioApi<'_> {
        audio::AudioApi { client: self }
    }

    pub fn ml(&self) -> ml::MlApi<'_> {
        ml::MlApi { client: self }
    }

    pub fn users(&self) -> users::UsersApi<'_> {
        users::UsersApi { client: self }
    }

    pub fn keys(&self) -> keys::KeysApi<'_> {
        keys::KeysApi { client: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_envelope_success() {
        let envelope: Envelope<Value> =
            serde_json::from_str(r#"{"success":true,"data":{"x":1}}"#).unwrap();
        let data = envelope.into_data().unwrap();
        assert_eq!(data["x"], 1);
    }

    #[test]
    fn test_envelope_rejection_carries_message() {
        let envelope: Envelope<Value> =
            serde_json::from_str(r#"{"success":false,"message":"No babies"}"#).unwrap();
        match envelope.into_data() {
            Err(ApiError::Rejected(message)) => assert_eq!(message, "No babies"),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_missing_data() {
        let envelope: Envelope<Value> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(matches!(
            envelope.into_data(),
            Err(ApiError::ParseFailed(_))
        ));
    }

    #[test]
    fn test_envelope_ack() {
        let envelope: Envelope<Value> =
            serde_json::from_str(r#"{"success":true,"message":"Email sent"}"#).unwrap();
        assert_eq!(envelope.into_ack().unwrap(), "Email sent");
    }
}
