//! ONNX inference and the logistic fallback
//!
//! The supervised model is an offline-trained classifier exported to ONNX
//! and run through tract. Inputs are baseline z-scores in fixed feature
//! order; missing slots are imputed at zero, i.e. "at normal", so a data
//! gap never reads as a degradation signal.

use super::RiskScorer;
use crate::anomaly::RollingBaseline;
use crate::error::AnalyticsError;
use crate::models::FeatureVector;
use anyhow::{Context, Result};
use tract_onnx::prelude::*;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based failure-risk scorer using tract for lightweight inference
pub struct OnnxScorer {
    model: TractModel,
    /// Input feature order the model was trained with
    feature_names: Vec<String>,
    source: String,
}

impl OnnxScorer {
    /// Build a scorer from raw model bytes and its input feature order
    pub fn new(model_bytes: &[u8], feature_names: Vec<String>, source: String) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, feature_names.len()]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            model,
            feature_names,
            source,
        })
    }

    fn features_to_tensor(&self, vector: &FeatureVector, baseline: &RollingBaseline) -> Tensor {
        let data: Vec<f32> = self
            .feature_names
            .iter()
            .map(|name| {
                vector
                    .get(name)
                    .and_then(|value| baseline.z_score(name, value))
                    .unwrap_or(0.0) as f32
            })
            .collect();

        tract_ndarray::Array2::from_shape_vec((1, self.feature_names.len()), data)
            .expect("shape matches feature count")
            .into()
    }
}

impl RiskScorer for OnnxScorer {
    fn score(
        &self,
        vector: &FeatureVector,
        baseline: &RollingBaseline,
    ) -> Result<f64, AnalyticsError> {
        let input = self.features_to_tensor(vector, baseline);

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| AnalyticsError::model_unavailable(format!("inference failed: {e}")))?;

        let output = outputs
            .first()
            .ok_or_else(|| AnalyticsError::model_unavailable("model produced no output"))?;

        let view = output
            .to_array_view::<f32>()
            .map_err(|e| AnalyticsError::model_unavailable(format!("bad output tensor: {e}")))?;

        let raw = view
            .iter()
            .next()
            .copied()
            .ok_or_else(|| AnalyticsError::model_unavailable("empty output tensor"))?;

        Ok((raw as f64 * 100.0).clamp(0.0, 100.0))
    }

    fn source(&self) -> String {
        self.source.clone()
    }
}

/// Logistic response midpoint, in units of mean positive z-score
const LOGISTIC_MIDPOINT: f64 = 2.0;

/// Logistic response steepness
const LOGISTIC_STEEPNESS: f64 = 1.5;

/// Deterministic fallback scorer used when no model is loaded
///
/// Computes the mean positive z-score over present features and maps it
/// through a logistic curve, so the probability rises monotonically as
/// features move above their baseline.
pub struct LogisticScorer;

impl LogisticScorer {
    /// Mean positive z-score across the vector's present features
    fn degradation_load(vector: &FeatureVector, baseline: &RollingBaseline) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;

        for (name, slot) in &vector.features {
            if let Some(value) = slot.value() {
                if let Some(z) = baseline.z_score(name, value) {
                    sum += z.max(0.0);
                    count += 1;
                }
            }
        }

        if count == 0 {
            return None;
        }
        Some(sum / count as f64)
    }
}

impl RiskScorer for LogisticScorer {
    fn score(
        &self,
        vector: &FeatureVector,
        baseline: &RollingBaseline,
    ) -> Result<f64, AnalyticsError> {
        if !baseline.is_ready() {
            return Err(AnalyticsError::DataGap {
                entity: vector.entity_id.clone(),
                feature: "baseline".to_string(),
                samples: baseline.observed() as usize,
                required: crate::anomaly::MIN_BASELINE_SAMPLES as usize,
            });
        }

        let load = Self::degradation_load(vector, baseline).ok_or_else(|| {
            AnalyticsError::Unscoreable {
                entity: vector.entity_id.clone(),
            }
        })?;

        let probability = 100.0 / (1.0 + (-LOGISTIC_STEEPNESS * (load - LOGISTIC_MIDPOINT)).exp());
        Ok(probability.clamp(0.0, 100.0))
    }

    fn source(&self) -> String {
        "heuristic".to_string()
    }
}
