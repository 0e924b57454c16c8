//! Overall Equipment Effectiveness

use crate::models::{FeatureValue, OeeScope, OeeScore};

/// Configuration for OEE computation
#[derive(Debug, Clone)]
pub struct OeeConfig {
    /// Composite reported when any component is missing. Documented
    /// fallback, not a silent zero; the result is flagged `degraded`.
    pub degraded_composite: f64,
}

impl Default for OeeConfig {
    fn default() -> Self {
        Self {
            degraded_composite: 75.0,
        }
    }
}

/// Component inputs, each a ratio already scaled to [0, 100]
#[derive(Debug, Clone)]
pub struct OeeInputs {
    pub quality: FeatureValue,
    pub availability: FeatureValue,
    pub performance: FeatureValue,
}

/// Compute an OEE score from its components
///
/// `composite = quality * availability * performance / 10000`, which keeps
/// the result in [0, 100] when every component is. Components are clamped
/// before multiplying so a noisy ratio cannot push the composite out of
/// range.
pub fn compute_oee(scope: OeeScope, inputs: &OeeInputs, config: &OeeConfig, now: i64) -> OeeScore {
    let quality = inputs.quality.value().map(clamp_pct);
    let availability = inputs.availability.value().map(clamp_pct);
    let performance = inputs.performance.value().map(clamp_pct);

    let (composite, degraded) = match (quality, availability, performance) {
        (Some(q), Some(a), Some(p)) => (q * a * p / 10_000.0, false),
        _ => (clamp_pct(config.degraded_composite), true),
    };

    OeeScore {
        scope,
        quality,
        availability,
        performance,
        composite,
        degraded,
        timestamp: now,
    }
}

fn clamp_pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
