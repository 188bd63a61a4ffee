//! Cry-classification and prediction endpoints.
//!
//! The model itself runs in an external service; these calls only request
//! analyses and read back results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Envelope;
use crate::client::ApiClient;
use crate::error::AppError;

/// What a prediction is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionKind {
    Cry,
    Development,
    Health,
}

/// A stored model prediction for a baby.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(alias = "_id")]
    pub id: String,
    pub baby_id: String,
    #[serde(rename = "type")]
    pub kind: PredictionKind,
    pub prediction: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Classification result for a single recording.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default)]
    pub recording_id: Option<String>,
    pub prediction: String,
    pub confidence: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PredictionsData {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct PredictionData {
    prediction: Prediction,
}

#[derive(Debug, Deserialize)]
struct AnalysisData {
    analysis: Analysis,
}

#[derive(Debug, Deserialize)]
struct ClassesData {
    classes: Vec<String>,
}

pub struct MlApi<'c> {
    pub(crate) client: &'c ApiClient,
}

impl MlApi<'_> {
    pub async fn predictions(&self, baby_id: &str) -> Result<Vec<Prediction>, AppError> {
        let envelope: Envelope<PredictionsData> = self
            .client
            .get(&format!("/ml/predictions/{}", baby_id))
            .await?;
        Ok(envelope.into_data()?.predictions)
    }

    pub async fn prediction(&self, id: &str) -> Result<Prediction, AppError> {
        let envelope: Envelope<PredictionData> =
            self.client.get(&format!("/ml/prediction/{}", id)).await?;
        Ok(envelope.into_data()?.prediction)
    }

    /// Ask the model for a new prediction of the given kind.
    pub async fn request_prediction(
        &self,
        baby_id: &str,
        kind: PredictionKind,
    ) -> Result<Prediction, AppError> {
        let envelope: Envelope<PredictionData> = self
            .client
            .post(
                &format!("/ml/predict/{}", baby_id),
                serde_json::json!({ "type": kind }),
            )
            .await?;
        Ok(envelope.into_data()?.prediction)
    }

    /// Model service status, passed through untyped.
    pub async fn status(&self) -> Result<Value, AppError> {
        let envelope: Envelope<Value> = self.client.get("/ml/status").await?;
        envelope.into_data().map_err(AppError::from)
    }

    /// Model quality metrics, passed through untyped.
    pub async fn metrics(&self) -> Result<Value, AppError> {
        let envelope: Envelope<Value> = self.client.get("/ml/metrics").await?;
        envelope.into_data().map_err(AppError::from)
    }

    /// Class labels the classifier can emit.
    pub async fn classes(&self) -> Result<Vec<String>, AppError> {
        let envelope: Envelope<ClassesData> = self.client.get("/ml/classes").await?;
        Ok(envelope.into_data()?.classes)
    }

    pub async fn analyze(&self, recording_id: &str) -> Result<Analysis, AppError> {
        let envelope: Envelope<AnalysisData> = self
            .client
            .post(
                &format!("/ml/analyze/{}", recording_id),
                serde_json::json!({}),
            )
            .await?;
        Ok(envelope.into_data()?.analysis)
    }

    pub async fn analysis(&self, recording_id: &str) -> Result<Analysis, AppError> {
        let envelope: Envelope<AnalysisData> = self
            .client
            .get(&format!("/ml/analysis/{}", recording_id))
            .await?;
        Ok(envelope.into_data()?.analysis)
    }

    /// Per-user analysis statistics, passed through untyped.
    pub async fn stats(&self, user_id: &str) -> Result<Value, AppError> {
        let envelope: Envelope<Value> =
            self.client.get(&format!("/ml/stats/{}", user_id)).await?;
        envelope.into_data().map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_deserializes_wire_shape() {
        let prediction: Prediction = serde_json::from_str(
            r#"{
                "id": "p1",
                "babyId": "b1",
                "type": "cry",
                "prediction": "hungry",
                "confidence": 0.92,
                "createdAt": "2026-08-01T09:30:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(prediction.kind, PredictionKind::Cry);
        assert_eq!(prediction.prediction, "hungry");
    }

    #[test]
    fn test_analysis_tolerates_minimal_payload() {
        let analysis: Analysis =
            serde_json::from_str(r#"{"prediction":"tired","confidence":0.71}"#).unwrap();
        assert!(analysis.recording_id.is_none());
        assert!(analysis.created_at.is_none());
    }
}
