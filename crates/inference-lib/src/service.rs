//! Request orchestration: health and predict
//!
//! Batches are reconciled in full but only the first row is scored and
//! returned; callers submitting N records always receive one answer.

use crate::artifacts::ArtifactStore;
use crate::classifier::ProbabilisticClassifier;
use crate::error::PredictionError;
use crate::models::{HealthResponse, InputRecord, PredictResponse, PredictionResult};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::{FeatureReconciler, Scorer};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::debug;

/// Stateless predict/health service over an immutable artifact store
pub struct PredictionService {
    store: ArtifactStore,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(store: ArtifactStore, logger: StructuredLogger) -> Self {
        let metrics = ServiceMetrics::new();
        let classifier = store.active_classifier();
        metrics.set_model_info(
            classifier.name(),
            classifier.is_calibrated(),
            store.schema().len(),
        );
        logger.log_artifacts_loaded(
            &store.schema().origin().to_string(),
            store.schema().len(),
            classifier.name(),
            classifier.is_calibrated(),
        );

        Self {
            store,
            metrics,
            logger,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    fn feature_names(&self) -> Vec<String> {
        self.store.schema().names().to_vec()
    }

    /// The expected input contract
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            features_expected: self.feature_names(),
        }
    }

    /// Reconcile and score a JSON payload (object or array of objects)
    pub fn predict(&self, payload: &Value) -> Result<PredictResponse, PredictionError> {
        let start = Instant::now();

        let outcome = catch_unwind(AssertUnwindSafe(|| self.run_pipeline(payload)))
            .unwrap_or_else(|_| Err(PredictionError::processing("internal failure while scoring")));

        match outcome {
            Ok((result, rows)) => {
                let elapsed = start.elapsed();
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions(result.label.as_str());
                if rows > 1 {
                    self.metrics.add_batch_rows_ignored((rows - 1) as u64);
                }
                self.logger.log_prediction(
                    result.label.as_str(),
                    result.probability,
                    rows,
                    elapsed.as_micros(),
                );

                Ok(PredictResponse {
                    used_features: self.feature_names(),
                    prediction: result.label,
                    probability: result.probability,
                })
            }
            Err(err) => {
                self.record_rejection(&err);
                Err(err)
            }
        }
    }

    /// Count and log a request rejected at the boundary
    pub fn record_rejection(&self, err: &PredictionError) {
        self.metrics.inc_prediction_errors(err.kind());
        self.logger.log_rejected(err.kind(), &err.to_string());
    }

    fn run_pipeline(&self, payload: &Value) -> Result<(PredictionResult, usize), PredictionError> {
        let records = records_from_payload(payload)?;

        let reconciler = FeatureReconciler::new(self.store.schema());
        let prepared = reconciler.reconcile_batch(records.iter().copied());
        debug!(rows = prepared.len(), "Payload reconciled");

        let first = prepared
            .first()
            .ok_or_else(|| PredictionError::processing("no records to score"))?;
        let result = Scorer::new(&self.store)
            .score(first)
            .map_err(|e| PredictionError::processing(format!("{:#}", e)))?;

        Ok((result, prepared.len()))
    }
}

/// Split a payload into records: an object is a one-row batch, an array is
/// a batch of objects, anything else is rejected.
pub fn records_from_payload(payload: &Value) -> Result<Vec<&InputRecord>, PredictionError> {
    match payload {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_object().ok_or_else(|| {
                    PredictionError::processing(format!("record {} is not a JSON object", i))
                })
            })
            .collect(),
        _ => Err(PredictionError::InvalidRequestFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::Scaler;
    use crate::classifier::LogisticClassifier;
    use crate::models::{Label, ScaledVector};
    use crate::schema::FeatureSchema;
    use serde_json::json;

    /// Positive probability equals the first scaled feature, clamped
    struct EchoClassifier;

    impl ProbabilisticClassifier for EchoClassifier {
        fn predict_proba(&self, rows: &[ScaledVector]) -> anyhow::Result<Vec<[f64; 2]>> {
            Ok(rows
                .iter()
                .map(|r| {
                    let p = r.values()[0].clamp(0.0, 1.0);
                    [1.0 - p, p]
                })
                .collect())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct PanickingClassifier;

    impl ProbabilisticClassifier for PanickingClassifier {
        fn predict_proba(&self, _rows: &[ScaledVector]) -> anyhow::Result<Vec<[f64; 2]>> {
            panic!("boom")
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn identity_scaler(n: usize) -> Scaler {
        Scaler::Standard {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    fn echo_service() -> PredictionService {
        let schema = FeatureSchema::new(vec!["Age_log".into(), "Vintage".into()]).unwrap();
        let store =
            ArtifactStore::assemble(schema, identity_scaler(2), Box::new(EchoClassifier), None)
                .unwrap();
        PredictionService::new(store, StructuredLogger::new("test"))
    }

    fn default_service() -> PredictionService {
        let store = ArtifactStore::assemble(
            FeatureSchema::built_in(),
            identity_scaler(11),
            Box::new(LogisticClassifier::new(
                vec![0.5, -0.3, 0.8, 0.1, 0.0, -1.2, 0.4, 0.9, 0.0, 0.0, 0.0],
                -1.0,
            )),
            None,
        )
        .unwrap();
        PredictionService::new(store, StructuredLogger::new("test"))
    }

    #[test]
    fn test_new_records_active_classifier() {
        let service = default_service();
        let classifier = service.store().active_classifier();
        assert_eq!(classifier.name(), "logistic");
        assert!(!classifier.is_calibrated());
    }

    #[test]
    fn test_health_lists_schema() {
        let service = default_service();
        let health = service.health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.features_expected.len(), 11);
        assert_eq!(health.features_expected[0], "Gender_Male");
    }

    #[test]
    fn test_predict_object() {
        let service = echo_service();
        let response = service.predict(&json!({"Age_log": 0.734, "extra": 1})).unwrap();
        assert_eq!(response.used_features, vec!["Age_log", "Vintage"]);
        assert_eq!(response.probability, 0.73);
        assert_eq!(response.prediction, Label::Yes);
    }

    #[test]
    fn test_predict_array_scores_first_row_only() {
        let service = echo_service();
        let response = service
            .predict(&json!([{"Age_log": 0.2}, {"Age_log": 0.9}]))
            .unwrap();
        assert_eq!(response.probability, 0.2);
    }

    #[test]
    fn test_predict_rejects_non_container_payload() {
        let service = echo_service();
        for payload in [json!("not-json-object-or-array"), json!(42), json!(null), json!(true)] {
            assert_eq!(
                service.predict(&payload),
                Err(PredictionError::InvalidRequestFormat)
            );
        }
    }

    #[test]
    fn test_predict_empty_array_is_processing_error() {
        let service = echo_service();
        assert!(matches!(
            service.predict(&json!([])),
            Err(PredictionError::Processing(_))
        ));
    }

    #[test]
    fn test_predict_array_with_non_object_is_processing_error() {
        let service = echo_service();
        let err = service.predict(&json!([{"Age_log": 1}, 5])).unwrap_err();
        assert_eq!(
            err,
            PredictionError::Processing("record 1 is not a JSON object".to_string())
        );
    }

    #[test]
    fn test_predict_empty_object_is_deterministic() {
        let service = default_service();
        let first = service.predict(&json!({})).unwrap();
        let second = service.predict(&json!({})).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.used_features, service.health().features_expected);
    }

    #[test]
    fn test_non_numeric_field_does_not_fail() {
        let service = default_service();
        let with_garbage = service.predict(&json!({"Age_log": "abc"})).unwrap();
        let with_zero = service.predict(&json!({"Age_log": 0})).unwrap();
        assert_eq!(with_garbage, with_zero);
    }

    #[test]
    fn test_panic_in_classifier_becomes_processing_error() {
        let schema = FeatureSchema::new(vec!["x".into()]).unwrap();
        let store =
            ArtifactStore::assemble(schema, identity_scaler(1), Box::new(PanickingClassifier), None)
                .unwrap();
        let service = PredictionService::new(store, StructuredLogger::new("test"));

        assert!(matches!(
            service.predict(&json!({"x": 1})),
            Err(PredictionError::Processing(_))
        ));
    }
}
