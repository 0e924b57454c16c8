//! Supervised failure-risk scoring
//!
//! The scoring function is fixed at runtime: trained offline, loaded as an
//! ONNX graph and swapped atomically. A deterministic logistic fallback
//! covers the window before a model is loaded and any inference failure.

mod inference;
mod model_store;
mod rul;

pub use inference::{LogisticScorer, OnnxScorer};
pub use model_store::{ModelArtifact, ModelStore, ModelStoreConfig, ModelWorker};
pub use rul::estimate_rul;

use crate::anomaly::RollingBaseline;
use crate::error::AnalyticsError;
use crate::models::FeatureVector;

/// Trait for failure-probability scoring implementations
///
/// The contract: output bounded to [0, 100], monotonic response to
/// degradation-direction features, stable under floating-point reordering
/// (feature iteration is over a BTreeMap, so input order is fixed).
pub trait RiskScorer: Send + Sync {
    /// Probability of failure in [0, 100] for an entity's feature vector
    fn score(
        &self,
        vector: &FeatureVector,
        baseline: &RollingBaseline,
    ) -> Result<f64, AnalyticsError>;

    /// Identifier of the scoring function, reported with each prediction
    fn source(&self) -> String;
}

/// Confidence in a prediction, from sample sufficiency
///
/// The share of feature slots that carried a value, scaled to [0, 100].
/// Insufficient slots pull it down; an entirely empty vector is the
/// caller's cue to report the entity unscoreable instead.
pub fn confidence(vector: &FeatureVector) -> f64 {
    let total = vector.features.len();
    if total == 0 {
        return 0.0;
    }
    vector.present_count() as f64 / total as f64 * 100.0
}
