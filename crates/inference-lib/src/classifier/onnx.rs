//! ONNX classifier inference using tract
//!
//! Runs the exported binary classifier graph one row at a time with a
//! fixed `[1, n]` f32 input.

use super::{ProbabilisticClassifier, POSITIVE_CLASS};
use crate::models::ScaledVector;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning (5ms target)
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based binary classifier
pub struct OnnxClassifier {
    model: TractModel,
    num_features: usize,
}

impl OnnxClassifier {
    /// Load a classifier from an `.onnx` file
    pub fn from_path(path: &Path, num_features: usize) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read ONNX model {}", path.display()))?;
        Self::from_bytes(&bytes, num_features)
    }

    /// Load a classifier from model bytes
    pub fn from_bytes(model_bytes: &[u8], num_features: usize) -> Result<Self> {
        let model = Self::load_model(model_bytes, num_features)?;
        Ok(Self {
            model,
            num_features,
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], num_features: usize) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn row_to_tensor(&self, row: &ScaledVector) -> Result<Tensor> {
        if row.len() != self.num_features {
            anyhow::bail!(
                "Input has {} features, model expects {}",
                row.len(),
                self.num_features
            );
        }
        let data: Vec<f32> = row.values().iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.num_features), data)
            .context("Failed to shape input tensor")?;
        Ok(array.into())
    }

    fn run_row(&self, row: &ScaledVector) -> Result<f64> {
        let start = Instant::now();

        let input = self.row_to_tensor(row)?;
        let outputs = self.model.run(tvec!(input.into()))?;
        let positive = positive_probability(&outputs)?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(positive)
    }
}

impl ProbabilisticClassifier for OnnxClassifier {
    fn predict_proba(&self, rows: &[ScaledVector]) -> Result<Vec<[f64; 2]>> {
        rows.iter()
            .map(|row| {
                let p = self.run_row(row)?;
                Ok([1.0 - p, p])
            })
            .collect()
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

fn float_values(output: &Tensor) -> Option<Vec<f64>> {
    if let Ok(view) = output.to_array_view::<f32>() {
        return Some(view.iter().map(|v| *v as f64).collect());
    }
    output
        .to_array_view::<f64>()
        .ok()
        .map(|view| view.iter().copied().collect())
}

/// Pick the positive-class probability out of the graph outputs.
///
/// Converted classifiers usually emit `(label, probabilities)`; the label
/// tensor is integer-typed and skipped. A two-column float output wins,
/// otherwise a single float value is read as P(positive).
fn positive_probability(outputs: &[TValue]) -> Result<f64> {
    for output in outputs {
        if output.shape().last() == Some(&2) {
            if let Some(values) = float_values(output) {
                return Ok(values[POSITIVE_CLASS]);
            }
        }
    }

    for output in outputs {
        if let Some(values) = float_values(output) {
            if values.len() == 1 {
                return Ok(values[0]);
            }
        }
    }

    anyhow::bail!("Model produced no probability output ({} outputs)", outputs.len())
}
