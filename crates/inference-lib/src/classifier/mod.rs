//! Probabilistic classifiers used at inference time

mod calibration;
mod onnx;

pub use calibration::{CalibratedClassifier, PlattScaling};
pub use onnx::OnnxClassifier;

use crate::models::ScaledVector;
use anyhow::Result;
use serde::Deserialize;

/// Index of the positive class in a probability pair
pub const POSITIVE_CLASS: usize = 1;

/// Trait for binary classifiers producing class probabilities
pub trait ProbabilisticClassifier: Send + Sync {
    /// `[P(negative), P(positive)]` for each row, in input order
    fn predict_proba(&self, rows: &[ScaledVector]) -> Result<Vec<[f64; 2]>>;

    /// Short identifier for logs and metrics
    fn name(&self) -> &str;
}

/// Classifier selected once at startup from calibration-data availability
pub enum ActiveClassifier {
    /// Base model probabilities as-is
    Uncalibrated(Box<dyn ProbabilisticClassifier>),
    /// Base model wrapped in a fitted sigmoid mapping
    SigmoidCalibrated(CalibratedClassifier),
}

impl ActiveClassifier {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, ActiveClassifier::SigmoidCalibrated(_))
    }

    /// Fitted sigmoid parameters, if calibrated
    pub fn calibration(&self) -> Option<&PlattScaling> {
        match self {
            ActiveClassifier::Uncalibrated(_) => None,
            ActiveClassifier::SigmoidCalibrated(c) => Some(c.scaling()),
        }
    }
}

impl ProbabilisticClassifier for ActiveClassifier {
    fn predict_proba(&self, rows: &[ScaledVector]) -> Result<Vec<[f64; 2]>> {
        match self {
            ActiveClassifier::Uncalibrated(base) => base.predict_proba(rows),
            ActiveClassifier::SigmoidCalibrated(calibrated) => calibrated.predict_proba(rows),
        }
    }

    fn name(&self) -> &str {
        match self {
            ActiveClassifier::Uncalibrated(base) => base.name(),
            ActiveClassifier::SigmoidCalibrated(calibrated) => calibrated.name(),
        }
    }
}

impl std::fmt::Debug for ActiveClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActiveClassifier::Uncalibrated(base) => {
                f.debug_tuple("Uncalibrated").field(&base.name()).finish()
            }
            ActiveClassifier::SigmoidCalibrated(c) => f
                .debug_tuple("SigmoidCalibrated")
                .field(c.scaling())
                .finish(),
        }
    }
}

/// Logistic model over scaled features, loaded from a JSON export
/// (`{"weights": [...], "intercept": ...}`) when no ONNX graph is shipped
///
/// `P(positive) = sigmoid(w . x + intercept)`
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticClassifier {
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticClassifier {
    pub fn new(weights: Vec<f64>, intercept: f64) -> Self {
        Self { weights, intercept }
    }

    pub fn num_features(&self) -> usize {
        self.weights.len()
    }
}

impl ProbabilisticClassifier for LogisticClassifier {
    fn predict_proba(&self, rows: &[ScaledVector]) -> Result<Vec<[f64; 2]>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.weights.len() {
                    anyhow::bail!(
                        "Input has {} features, model expects {}",
                        row.len(),
                        self.weights.len()
                    );
                }
                let z: f64 = self
                    .weights
                    .iter()
                    .zip(row.values())
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + self.intercept;
                let p = 1.0 / (1.0 + (-z).exp());
                Ok([1.0 - p, p])
            })
            .collect()
    }

    fn name(&self) -> &str {
        "logistic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_classifier_probabilities() {
        let model = LogisticClassifier::new(vec![1.0, -1.0], 0.0);
        let rows = vec![
            ScaledVector(vec![0.0, 0.0]),
            ScaledVector(vec![5.0, 0.0]),
        ];
        let probs = model.predict_proba(&rows).unwrap();
        assert!((probs[0][POSITIVE_CLASS] - 0.5).abs() < 1e-12);
        assert!(probs[1][POSITIVE_CLASS] > 0.99);
        assert!((probs[1][0] + probs[1][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_classifier_rejects_wrong_width() {
        let model = LogisticClassifier::new(vec![1.0, -1.0], 0.0);
        assert!(model.predict_proba(&[ScaledVector(vec![1.0])]).is_err());
    }

    #[test]
    fn test_active_classifier_uncalibrated_delegates() {
        let base = LogisticClassifier::new(vec![0.0], 0.0);
        let active = ActiveClassifier::Uncalibrated(Box::new(base));
        assert!(!active.is_calibrated());
        assert!(active.calibration().is_none());
        assert_eq!(active.name(), "logistic");
        let probs = active.predict_proba(&[ScaledVector(vec![3.0])]).unwrap();
        assert!((probs[0][POSITIVE_CLASS] - 0.5).abs() < 1e-12);
    }
}
