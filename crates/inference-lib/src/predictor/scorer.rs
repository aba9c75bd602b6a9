//! Scoring: scale, classify, threshold
//!
//! Thresholding happens on the rounded probability, so the reported label
//! and probability always agree: anything reported as 0.01 or more is YES.
//! Thresholding the raw value instead would report a raw probability in
//! [0.005, 0.01) as 0.01 with label NO.

use crate::artifacts::ArtifactStore;
use crate::classifier::{ProbabilisticClassifier, POSITIVE_CLASS};
use crate::models::{Label, PredictionResult, PreparedVector};
use anyhow::{Context, Result};

/// Positive-class probability at or above which the label is YES
pub const DECISION_THRESHOLD: f64 = 0.01;

/// Decimal places kept in the reported probability
pub const PROBABILITY_DECIMALS: i32 = 2;

/// Turns prepared vectors into thresholded predictions
#[derive(Debug, Clone, Copy)]
pub struct Scorer<'a> {
    store: &'a ArtifactStore,
}

impl<'a> Scorer<'a> {
    pub fn new(store: &'a ArtifactStore) -> Self {
        Self { store }
    }

    /// Score a single prepared vector
    pub fn score(&self, input: &PreparedVector) -> Result<PredictionResult> {
        let scaled = self.store.scaler().transform(input)?;

        let probabilities = self
            .store
            .active_classifier()
            .predict_proba(std::slice::from_ref(&scaled))?;
        let pair = probabilities
            .first()
            .context("Classifier returned no probabilities")?;

        let positive = pair[POSITIVE_CLASS];
        if !positive.is_finite() {
            anyhow::bail!("Classifier returned non-finite probability {}", positive);
        }

        let probability = round_probability(positive.clamp(0.0, 1.0));
        Ok(PredictionResult {
            label: decide(probability),
            probability,
        })
    }
}

/// Round to [`PROBABILITY_DECIMALS`] places, exact ties to even
pub fn round_probability(p: f64) -> f64 {
    let factor = 10f64.powi(PROBABILITY_DECIMALS);
    (p * factor).round_ties_even() / factor
}

/// Apply [`DECISION_THRESHOLD`]
pub fn decide(probability: f64) -> Label {
    if probability >= DECISION_THRESHOLD {
        Label::Yes
    } else {
        Label::No
    }
}
