//! Error taxonomy for the scoring pipeline
//!
//! None of these surface as user-facing failures: every variant resolves
//! to either a flagged degraded result or a retained previous snapshot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A feature slot had too few valid samples. Degrades confidence for
    /// the affected entity but never aborts the cycle for the others.
    #[error("insufficient samples for {feature} on {entity}: {samples} of {required}")]
    DataGap {
        entity: String,
        feature: String,
        samples: usize,
        required: usize,
    },

    /// No usable feature vector for an entity. The entity is skipped for
    /// this cycle and its previous score is retained, never overwritten.
    #[error("no usable feature vector for {entity}")]
    Unscoreable { entity: String },

    /// The scoring function failed to load or execute. The prior snapshot
    /// stays visible and the cycle is marked degraded.
    #[error("scoring model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// The publish sink rejected a snapshot. Results are buffered and
    /// retried, never silently dropped.
    #[error("failed to publish snapshot: {reason}")]
    Publish { reason: String },
}

impl AnalyticsError {
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
        }
    }

    pub fn publish(reason: impl Into<String>) -> Self {
        Self::Publish {
            reason: reason.into(),
        }
    }
}
