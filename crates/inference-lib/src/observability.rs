//! Observability infrastructure for the inference service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, labels, errors, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    batch_rows_ignored_total: IntCounter,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "risk_inference_prediction_latency_seconds",
                "Time spent reconciling and scoring a predict request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "risk_inference_predictions_total",
                "Predictions returned, by label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "risk_inference_prediction_errors_total",
                "Rejected predict requests, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            batch_rows_ignored_total: register_int_counter!(
                "risk_inference_batch_rows_ignored_total",
                "Rows reconciled but not scored because only the first row of a batch is answered"
            )
            .expect("Failed to register batch_rows_ignored_total"),

            model_info: register_gauge_vec!(
                "risk_inference_model_info",
                "Information about the loaded model artifacts",
                &["classifier", "calibrated", "features"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a prediction latency observation
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, label: &str) {
        self.inner()
            .predictions_total
            .with_label_values(&[label])
            .inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn add_batch_rows_ignored(&self, rows: u64) {
        self.inner().batch_rows_ignored_total.inc_by(rows);
    }

    /// Update model info
    pub fn set_model_info(&self, classifier: &str, calibrated: bool, features: usize) {
        let calibrated = calibrated.to_string();
        let features = features.to_string();
        // Reset previous model
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[classifier, calibrated.as_str(), features.as_str()])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for startup, predictions
/// and rejected requests.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, bind_addr: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            bind_addr = %bind_addr,
            "Risk inference service started"
        );
    }

    /// Log the assembled artifact store
    pub fn log_artifacts_loaded(
        &self,
        schema_origin: &str,
        features: usize,
        classifier: &str,
        calibrated: bool,
    ) {
        info!(
            event = "artifacts_loaded",
            instance = %self.instance,
            schema_origin = %schema_origin,
            features = features,
            classifier = %classifier,
            calibrated = calibrated,
            "Model artifacts loaded"
        );
    }

    /// Log a prediction generation event
    pub fn log_prediction(&self, label: &str, probability: f64, rows: usize, elapsed_us: u128) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            label = %label,
            probability = probability,
            rows = rows,
            elapsed_us = elapsed_us as u64,
            "Generated risk prediction"
        );
    }

    /// Log a rejected request; the cause stays in the log only
    pub fn log_rejected(&self, kind: &str, cause: &str) {
        warn!(
            event = "prediction_rejected",
            instance = %self.instance,
            kind = %kind,
            cause = %cause,
            "Predict request rejected"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Risk inference service shutting down"
        );
    }
}
