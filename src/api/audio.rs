//! Audio recording endpoints.
//!
//! Uploads go out as multipart forms whose parts keep their bytes, so an
//! upload interrupted by a token refresh can be replayed intact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ml::Analysis;
use super::Envelope;
use crate::client::{ApiClient, Part};
use crate::error::AppError;

/// Category assigned to a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingKind {
    Cry,
    Laugh,
    Babbling,
    Other,
}

impl RecordingKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Cry => "cry",
            Self::Laugh => "laugh",
            Self::Babbling => "babbling",
            Self::Other => "other",
        }
    }
}

/// An uploaded audio recording.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    #[serde(alias = "_id")]
    pub id: String,
    pub baby_id: String,
    pub url: String,
    /// Duration in seconds.
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: RecordingKind,
}

#[derive(Debug, Deserialize)]
struct RecordingsData {
    recordings: Vec<Recording>,
}

#[derive(Debug, Deserialize)]
struct RecordingData {
    recording: Recording,
}

#[derive(Debug, Deserialize)]
struct AnalysisData {
    analysis: Analysis,
}

pub struct AudioApi<'c> {
    pub(crate) client: &'c ApiClient,
}

impl AudioApi<'_> {
    /// List recordings for a baby.
    pub async fn list(&self, baby_id: &str) -> Result<Vec<Recording>, AppError> {
        let endpoint = format!("/audio/recordings?babyId={}", urlencoding::encode(baby_id));
        let envelope: Envelope<RecordingsData> = self.client.get(&endpoint).await?;
        Ok(envelope.into_data()?.recordings)
    }

    pub async fn get(&self, id: &str) -> Result<Recording, AppError> {
        let envelope: Envelope<RecordingData> =
            self.client.get(&format!("/audio/recording/{}", id)).await?;
        Ok(envelope.into_data()?.recording)
    }

    /// Upload a recording for a baby.
    pub async fn upload(
        &self,
        baby_id: &str,
        file_name: &str,
        mime: &str,
        data: Vec<u8>,
        kind: RecordingKind,
    ) -> Result<Recording, AppError> {
        let parts = vec![
            Part::bytes("audio", data, file_name, mime),
            Part::text("type", kind.as_str()),
        ];
        let envelope: Envelope<RecordingData> = self
            .client
            .post_multipart(&format!("/audio/{}", baby_id), parts)
            .await?;
        Ok(envelope.into_data()?.recording)
    }

    pub async fn delete(&self, id: &str) -> Result<String, AppError> {
        let envelope: Envelope<serde_json::Value> = self
            .client
            .delete(&format!("/audio/recording/{}", id))
            .await?;
        envelope.into_ack().map_err(AppError::from)
    }

    /// Run cry analysis on an uploaded recording.
    pub async fn analyze(&self, id: &str) -> Result<Analysis, AppError> {
        let envelope: Envelope<AnalysisData> = self
            .client
            .post(&format!("/audio/analyze/{}", id), serde_json::json!({}))
            .await?;
        Ok(envelope.into_data()?.analysis)
    }
}
