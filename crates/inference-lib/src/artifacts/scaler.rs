//! Fitted feature scaler exported by the training pipeline

use crate::error::{ArtifactError, ArtifactKind};
use crate::models::{PreparedVector, ScaledVector};
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Persisted scaler parameters, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    /// Load and validate a scaler file
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::MissingArtifact {
                kind: ArtifactKind::Scaler,
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let scaler: Scaler = serde_json::from_str(&content)
            .map_err(|e| ArtifactError::invalid(ArtifactKind::Scaler, path, e))?;
        scaler
            .validate()
            .map_err(|reason| ArtifactError::invalid(ArtifactKind::Scaler, path, reason))?;
        Ok(scaler)
    }

    /// Number of features the scaler was fitted on
    pub fn width(&self) -> usize {
        match self {
            Scaler::Standard { mean, .. } => mean.len(),
            Scaler::MinMax { min, .. } => min.len(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let (offsets, scale) = match self {
            Scaler::Standard { mean, scale } => (mean, scale),
            Scaler::MinMax { min, scale } => (min, scale),
        };
        if offsets.is_empty() {
            return Err("scaler has no features".to_string());
        }
        if offsets.len() != scale.len() {
            return Err(format!(
                "parameter lengths differ ({} vs {})",
                offsets.len(),
                scale.len()
            ));
        }
        if offsets.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err("parameters must be finite".to_string());
        }
        Ok(())
    }

    /// Apply the fitted transform
    pub fn transform(&self, input: &PreparedVector) -> Result<ScaledVector> {
        if input.len() != self.width() {
            anyhow::bail!(
                "Scaler expects {} features, got {}",
                self.width(),
                input.len()
            );
        }

        let values = match self {
            Scaler::Standard { mean, scale } => input
                .values()
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| {
                    let s = if *s == 0.0 { 1.0 } else { *s };
                    (x - m) / s
                })
                .collect(),
            Scaler::MinMax { min, scale } => input
                .values()
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        };
        Ok(ScaledVector(values))
    }
}
