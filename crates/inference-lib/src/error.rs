//! Error taxonomy for artifact loading and request handling

use std::path::PathBuf;
use thiserror::Error;

/// Which persisted artifact an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    FeatureNames,
    Scaler,
    Model,
    CalibrationFeatures,
    CalibrationLabels,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArtifactKind::FeatureNames => "feature names",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Model => "model",
            ArtifactKind::CalibrationFeatures => "calibration features",
            ArtifactKind::CalibrationLabels => "calibration labels",
        };
        f.write_str(name)
    }
}

/// Fatal startup errors raised while assembling the artifact store
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{kind} not found at {}", path.display())]
    MissingArtifact { kind: ArtifactKind, path: PathBuf },

    #[error("invalid {kind} artifact at {}: {reason}", path.display())]
    InvalidArtifact {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error("invalid feature schema: {0}")]
    InvalidSchema(String),

    #[error("calibration failed: {0}")]
    Calibration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ArtifactError {
    pub fn invalid(kind: ArtifactKind, path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ArtifactError::InvalidArtifact {
            kind,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Request-boundary errors; both map to HTTP 400
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    /// Payload is neither a JSON object nor an array
    #[error("Invalid JSON format")]
    InvalidRequestFormat,

    /// Any failure during reconciliation or scoring
    #[error("Processing error: {0}")]
    Processing(String),
}

impl PredictionError {
    pub fn processing(err: impl std::fmt::Display) -> Self {
        PredictionError::Processing(err.to_string())
    }

    /// Short label used for metrics and log events
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::InvalidRequestFormat => "invalid_request_format",
            PredictionError::Processing(_) => "processing",
        }
    }
}
