//! Sigmoid (Platt) calibration over an already-fitted base classifier
//!
//! The base model is treated as prefit: only the mapping
//! `P(y=1 | f) = 1 / (1 + exp(A*f + B))` from its positive-class score `f`
//! is learned from held-out data.
//!
//! References:
//! - Platt (1999) "Probabilistic outputs for support vector machines"
//! - Lin, Lin & Weng (2007) "A note on Platt's probabilistic outputs"

use super::{ProbabilisticClassifier, POSITIVE_CLASS};
use crate::models::ScaledVector;
use anyhow::Result;
use serde::Serialize;
use tracing::debug;

const MAX_ITERATIONS: usize = 100;
const MIN_STEP: f64 = 1e-10;
/// Keeps the Hessian positive definite
const HESSIAN_RIDGE: f64 = 1e-12;
const GRADIENT_TOLERANCE: f64 = 1e-5;

/// Fitted sigmoid parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlattScaling {
    a: f64,
    b: f64,
}

impl PlattScaling {
    pub fn new(a: f64, b: f64) -> Result<Self> {
        if !a.is_finite() || !b.is_finite() {
            anyhow::bail!("Platt parameters must be finite, got a={}, b={}", a, b);
        }
        Ok(Self { a, b })
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    /// Map a raw score to a calibrated positive-class probability
    pub fn calibrate(&self, score: f64) -> f64 {
        let t = self.a.mul_add(score, self.b);
        if t >= 0.0 {
            let e = (-t).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + t.exp())
        }
    }

    /// Fit by Newton's method with backtracking line search.
    ///
    /// Labels greater than zero count as positive. Targets are smoothed to
    /// `(N+ + 1) / (N+ + 2)` and `1 / (N- + 2)` so a one-class set still
    /// yields finite parameters.
    pub fn fit(scores: &[f64], labels: &[f64]) -> Result<Self> {
        if scores.is_empty() {
            anyhow::bail!("Calibration set is empty");
        }
        if scores.len() != labels.len() {
            anyhow::bail!(
                "Calibration set has {} scores but {} labels",
                scores.len(),
                labels.len()
            );
        }
        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            anyhow::bail!("Calibration score is not finite: {}", bad);
        }

        let positives = labels.iter().filter(|y| **y > 0.0).count() as f64;
        let negatives = labels.len() as f64 - positives;

        let hi_target = (positives + 1.0) / (positives + 2.0);
        let lo_target = 1.0 / (negatives + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|y| if *y > 0.0 { hi_target } else { lo_target })
            .collect();

        let mut a = 0.0;
        let mut b = ((negatives + 1.0) / (positives + 1.0)).ln();
        let mut fval = objective(scores, &targets, a, b);

        let mut iterations = 0;
        while iterations < MAX_ITERATIONS {
            iterations += 1;

            let mut h11 = HESSIAN_RIDGE;
            let mut h22 = HESSIAN_RIDGE;
            let mut h21 = 0.0;
            let mut g1 = 0.0;
            let mut g2 = 0.0;

            for (f, t) in scores.iter().zip(&targets) {
                let z = f * a + b;
                let (p, q) = if z >= 0.0 {
                    let e = (-z).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = z.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = t - p;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < GRADIENT_TOLERANCE && g2.abs() < GRADIENT_TOLERANCE {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            while step >= MIN_STEP {
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_f = objective(scores, &targets, new_a, new_b);
                if new_f < fval + 1e-4 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    break;
                }
                step /= 2.0;
            }

            if step < MIN_STEP {
                debug!(iterations, "Platt line search made no progress");
                break;
            }
        }

        debug!(a, b, iterations, samples = scores.len(), "Platt scaling fitted");
        Self::new(a, b)
    }
}

/// Negative log-likelihood of the smoothed targets
fn objective(scores: &[f64], targets: &[f64], a: f64, b: f64) -> f64 {
    scores
        .iter()
        .zip(targets)
        .map(|(f, t)| {
            let z = f * a + b;
            if z >= 0.0 {
                t * z + (-z).exp().ln_1p()
            } else {
                (t - 1.0) * z + z.exp().ln_1p()
            }
        })
        .sum()
}

/// Base classifier wrapped in a fitted sigmoid mapping
pub struct CalibratedClassifier {
    base: Box<dyn ProbabilisticClassifier>,
    scaling: PlattScaling,
    name: String,
}

impl CalibratedClassifier {
    /// Fit the sigmoid on held-out rows without refitting `base`
    pub fn fit_prefit(
        base: Box<dyn ProbabilisticClassifier>,
        rows: &[ScaledVector],
        labels: &[f64],
    ) -> Result<Self> {
        let scores: Vec<f64> = base
            .predict_proba(rows)?
            .iter()
            .map(|pair| pair[POSITIVE_CLASS])
            .collect();
        let scaling = PlattScaling::fit(&scores, labels)?;
        Ok(Self::new(base, scaling))
    }

    pub fn new(base: Box<dyn ProbabilisticClassifier>, scaling: PlattScaling) -> Self {
        let name = format!("{}+sigmoid", base.name());
        Self {
            base,
            scaling,
            name,
        }
    }

    pub fn scaling(&self) -> &PlattScaling {
        &self.scaling
    }
}

impl ProbabilisticClassifier for CalibratedClassifier {
    fn predict_proba(&self, rows: &[ScaledVector]) -> Result<Vec<[f64; 2]>> {
        Ok(self
            .base
            .predict_proba(rows)?
            .into_iter()
            .map(|pair| {
                let p = self.scaling.calibrate(pair[POSITIVE_CLASS]);
                [1.0 - p, p]
            })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
