//! Inference library for the cross-sell risk classifier
//!
//! This crate provides the core functionality for:
//! - Feature schema resolution and artifact loading
//! - Probabilistic classifiers (ONNX, logistic) with sigmoid calibration
//! - Feature reconciliation and thresholded scoring
//! - The predict/health service and its observability

pub mod artifacts;
pub mod classifier;
pub mod error;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;
pub mod service;

pub use artifacts::{ArtifactPaths, ArtifactStore, CalibrationSet, Scaler};
pub use classifier::{ActiveClassifier, ProbabilisticClassifier};
pub use error::{ArtifactError, ArtifactKind, PredictionError};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use schema::{FeatureSchema, SchemaOrigin, DEFAULT_FEATURES};
pub use service::PredictionService;
