//! Request-to-prediction pipeline: reconcile, then score

mod reconciler;
mod scorer;

pub use reconciler::{coerce_numeric, FeatureReconciler};
pub use scorer::{decide, round_probability, Scorer, DECISION_THRESHOLD, PROBABILITY_DECIMALS};
