//! Core data models for the inference pipeline

use serde::{Deserialize, Serialize};

/// Arbitrary request record: unknown keys allowed, schema keys optional
pub type InputRecord = serde_json::Map<String, serde_json::Value>;

/// Reconciled input in schema order; every entry is finite
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedVector(pub Vec<f64>);

/// Prepared vector after the scaler transform
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledVector(pub Vec<f64>);

impl PreparedVector {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ScaledVector {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Thresholded decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Yes,
    No,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Yes => "YES",
            Label::No => "NO",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored outcome for a single record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: Label,
    /// Positive-class probability in [0, 1], rounded to two decimals
    pub probability: f64,
}

/// `POST /predict` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub used_features: Vec<String>,
    pub prediction: Label,
    pub probability: f64,
}

/// `GET /health` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub features_expected: Vec<String>,
}

/// Error body for 4xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Label::Yes).unwrap(), "\"YES\"");
        assert_eq!(serde_json::to_string(&Label::No).unwrap(), "\"NO\"");
    }

    #[test]
    fn test_predict_response_shape() {
        let response = PredictResponse {
            used_features: vec!["Age_log".to_string()],
            prediction: Label::Yes,
            probability: 0.42,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["used_features"][0], "Age_log");
        assert_eq!(json["prediction"], "YES");
        assert_eq!(json["probability"], 0.42);
    }
}
