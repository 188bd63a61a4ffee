//! Baby profile endpoints.

use serde::{Deserialize, Serialize};

use super::Envelope;
use crate::client::ApiClient;
use crate::error::{ApiError, AppError};

/// Birth and current value for a tracked measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurements {
    pub birth: f64,
    pub current: f64,
}

/// A baby profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baby {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub weight: Measurements,
    pub height: Measurements,
    #[serde(default)]
    pub notes: Option<String>,
    pub parent_id: String,
}

/// Fields for creating a baby profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBaby {
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub weight: Measurements,
    pub height: Measurements,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial update for a baby profile. Absent fields are left unchanged.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BabyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<Measurements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Measurements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BabiesData {
    babies: Vec<Baby>,
}

#[derive(Debug, Deserialize)]
struct BabyData {
    baby: Baby,
}

pub struct BabiesApi<'c> {
    pub(crate) client: &'c ApiClient,
}

impl BabiesApi<'_> {
    /// List all babies for the signed-in user.
    pub async fn list(&self) -> Result<Vec<Baby>, AppError> {
        let envelope: Envelope<BabiesData> = self.client.get("/babies").await?;
        Ok(envelope.into_data()?.babies)
    }

    pub async fn get(&self, id: &str) -> Result<Baby, AppError> {
        let envelope: Envelope<BabyData> =
            self.client.get(&format!("/babies/{}", id)).await?;
        Ok(envelope.into_data()?.baby)
    }

    pub async fn create(&self, baby: &NewBaby) -> Result<Baby, AppError> {
        let body =
            serde_json::to_value(baby).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
        let envelope: Envelope<BabyData> = self.client.post("/babies", body).await?;
        Ok(envelope.into_data()?.baby)
    }

    pub async fn update(&self, id: &str, update: &BabyUpdate) -> Result<Baby, AppError> {
        let body =
            serde_json::to_value(update).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
        let envelope: Envelope<BabyData> =
            self.client.put(&format!("/babies/{}", id), body).await?;
        Ok(envelope.into_data()?.baby)
    }

    pub async fn delete(&self, id: &str) -> Result<String, AppError> {
        let envelope: Envelope<serde_json::Value> =
            self.client.delete(&format!("/babies/{}", id)).await?;
        envelope.into_ack().map_err(AppError::from)
    }
}
