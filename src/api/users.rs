//! User profile and account endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Envelope;
use crate::client::{ApiClient, Body, Part};
use crate::error::{ApiError, AppError};

/// Editable profile of the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileData {
    profile: UserProfile,
}

pub struct UsersApi<'c> {
    pub(crate) client: &'c ApiClient,
}

impl UsersApi<'_> {
    pub async fn profile(&self) -> Result<UserProfile, AppError> {
        let envelope: Envelope<ProfileData> = self.client.get("/users/profile").await?;
        Ok(envelope.into_data()?.profile)
    }

    pub async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, AppError> {
        let body =
            serde_json::to_value(profile).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
        let envelope: Envelope<ProfileData> = self.client.put("/users/profile", body).await?;
        Ok(envelope.into_data()?.profile)
    }

    /// Upload a profile picture.
    pub async fn upload_avatar(
        &self,
        file_name: &str,
        mime: &str,
        data: Vec<u8>,
    ) -> Result<Value, AppError> {
        let parts = vec![Part::bytes("avatar", data, file_name, mime)];
        let envelope: Envelope<Value> = self
            .client
            .post_multipart("/users/upload/avatar", parts)
            .await?;
        envelope.into_data().map_err(AppError::from)
    }

    /// Permanently delete the account. Requires the current password and a
    /// typed confirmation.
    pub async fn delete_account(
        &self,
        password: &str,
        confirmation: &str,
        reason: &str,
    ) -> Result<String, AppError> {
        let body = json!({
            "password": password,
            "confirmation": confirmation,
            "reason": reason,
        });
        let envelope: Envelope<Value> = self
            .client
            .request_json(reqwest::Method::DELETE, "/users/account", &Body::Json(body))
            .await?;
        envelope.into_ack().map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_round_trips_camel_case() {
        let profile = UserProfile {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            phone: None,
            date_of_birth: None,
            location: Some("Oslo".into()),
            time_zone: Some("Europe/Oslo".into()),
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["timeZone"], "Europe/Oslo");
    }
}
