//! Startup artifact loading
//!
//! Everything here runs once, before the first request is accepted. The
//! resulting [`ArtifactStore`] is immutable and shared across workers.

mod scaler;

pub use scaler::Scaler;

use crate::classifier::{
    ActiveClassifier, CalibratedClassifier, LogisticClassifier, OnnxClassifier, PlattScaling,
    ProbabilisticClassifier,
};
use crate::error::{ArtifactError, ArtifactKind};
use crate::models::ScaledVector;
use crate::schema::FeatureSchema;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File locations of every persisted artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub feature_names: PathBuf,
    pub scaler: PathBuf,
    pub model: PathBuf,
    pub calibration_features: PathBuf,
    pub calibration_labels: PathBuf,
}

impl ArtifactPaths {
    /// Default file names under `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            feature_names: dir.join("feature_names.json"),
            scaler: dir.join("scaler.json"),
            model: dir.join("model.onnx"),
            calibration_features: dir.join("calibration_features.json"),
            calibration_labels: dir.join("calibration_labels.json"),
        }
    }
}

/// Held-out, already-scaled rows and their labels
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSet {
    pub rows: Vec<ScaledVector>,
    pub labels: Vec<f64>,
}

impl CalibrationSet {
    pub fn new(rows: Vec<Vec<f64>>, labels: Vec<f64>) -> Self {
        Self {
            rows: rows.into_iter().map(ScaledVector).collect(),
            labels,
        }
    }

    /// Load both calibration files; `None` unless both exist
    pub fn load(paths: &ArtifactPaths) -> Result<Option<Self>, ArtifactError> {
        let features_exist = paths.calibration_features.exists();
        let labels_exist = paths.calibration_labels.exists();

        match (features_exist, labels_exist) {
            (false, false) => return Ok(None),
            (true, false) | (false, true) => {
                warn!(
                    features = %paths.calibration_features.display(),
                    labels = %paths.calibration_labels.display(),
                    "Only one calibration file present, running uncalibrated"
                );
                return Ok(None);
            }
            (true, true) => {}
        }

        let rows: Vec<Vec<f64>> = read_json(
            &paths.calibration_features,
            ArtifactKind::CalibrationFeatures,
        )?;
        let labels: Vec<f64> =
            read_json(&paths.calibration_labels, ArtifactKind::CalibrationLabels)?;

        if rows.len() != labels.len() {
            return Err(ArtifactError::invalid(
                ArtifactKind::CalibrationLabels,
                &paths.calibration_labels,
                format!("{} labels for {} feature rows", labels.len(), rows.len()),
            ));
        }

        Ok(Some(Self::new(rows, labels)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(
    path: &Path,
    kind: ArtifactKind,
) -> Result<T, ArtifactError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| ArtifactError::invalid(kind, path, e))
}

/// Load the base classifier; the file extension selects the format
fn load_base_classifier(
    path: &Path,
    num_features: usize,
) -> Result<Box<dyn ProbabilisticClassifier>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::MissingArtifact {
            kind: ArtifactKind::Model,
            path: path.to_path_buf(),
        });
    }

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let model: LogisticClassifier = read_json(path, ArtifactKind::Model)?;
        if model.num_features() != num_features {
            return Err(ArtifactError::invalid(
                ArtifactKind::Model,
                path,
                format!(
                    "model has {} weights, schema has {} features",
                    model.num_features(),
                    num_features
                ),
            ));
        }
        return Ok(Box::new(model));
    }

    let model = OnnxClassifier::from_path(path, num_features)
        .map_err(|e| ArtifactError::invalid(ArtifactKind::Model, path, format!("{:#}", e)))?;
    Ok(Box::new(model))
}

/// Inference-ready model state, built once at startup
#[derive(Debug)]
pub struct ArtifactStore {
    schema: FeatureSchema,
    scaler: Scaler,
    classifier: ActiveClassifier,
    loaded_at: DateTime<Utc>,
}

impl ArtifactStore {
    /// Load every artifact from disk. Missing scaler or model is fatal.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let schema = FeatureSchema::resolve(&paths.feature_names)?;
        let scaler = Scaler::load(&paths.scaler)?;
        let base = load_base_classifier(&paths.model, schema.len())?;
        let calibration = CalibrationSet::load(paths)?;

        Self::assemble(schema, scaler, base, calibration)
    }

    /// Build a store from in-memory parts.
    ///
    /// With a calibration set the base classifier is wrapped in a sigmoid
    /// calibration fitted on it; otherwise the base classifier is used as-is.
    pub fn assemble(
        schema: FeatureSchema,
        scaler: Scaler,
        base: Box<dyn ProbabilisticClassifier>,
        calibration: Option<CalibrationSet>,
    ) -> Result<Self, ArtifactError> {
        if scaler.width() != schema.len() {
            return Err(ArtifactError::InvalidSchema(format!(
                "scaler has {} features, schema has {}",
                scaler.width(),
                schema.len()
            )));
        }

        let classifier = match calibration {
            Some(set) => {
                if let Some(row) = set.rows.iter().find(|r| r.len() != schema.len()) {
                    return Err(ArtifactError::Calibration(format!(
                        "calibration row has {} features, schema has {}",
                        row.len(),
                        schema.len()
                    )));
                }
                let calibrated = CalibratedClassifier::fit_prefit(base, &set.rows, &set.labels)
                    .map_err(|e| ArtifactError::Calibration(format!("{:#}", e)))?;
                info!(
                    samples = set.len(),
                    a = calibrated.scaling().a(),
                    b = calibrated.scaling().b(),
                    "Sigmoid calibration fitted"
                );
                ActiveClassifier::SigmoidCalibrated(calibrated)
            }
            None => {
                info!("No calibration data, using base classifier probabilities");
                ActiveClassifier::Uncalibrated(base)
            }
        };

        Ok(Self {
            schema,
            scaler,
            classifier,
            loaded_at: Utc::now(),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn active_classifier(&self) -> &ActiveClassifier {
        &self.classifier
    }

    pub fn is_calibrated(&self) -> bool {
        self.classifier.is_calibrated()
    }

    /// Fitted sigmoid parameters when running calibrated
    pub fn calibration(&self) -> Option<&PlattScaling> {
        self.classifier.calibration()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
