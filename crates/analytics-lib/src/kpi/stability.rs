//! Process stability index

use crate::models::{FeatureVector, StabilityIndex, Trend};
use std::collections::BTreeMap;

/// Configuration for the stability index
#[derive(Debug, Clone)]
pub struct StabilityConfig {
    /// Minimum index change against the previous cycle before the trend
    /// leaves `stable`.
    pub trend_delta: f64,
    /// Fixed per-variable scaling constants: a tag whose windowed standard
    /// deviation equals its constant contributes a 100-point penalty.
    pub variable_scale: BTreeMap<String, f64>,
    /// Scale applied to tags without an explicit constant.
    pub default_scale: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            trend_delta: 2.0,
            variable_scale: BTreeMap::new(),
            default_scale: 5.0,
        }
    }
}

/// Compute the stability index from key-variable variance
///
/// `index = 100 - normalized variance penalty`, averaged over the key
/// tags whose `std_dev` slot carries a value. The trend compares against
/// the previous cycle's index only; one prior value is all the memory
/// this needs.
pub fn compute_stability(
    vectors: &[&FeatureVector],
    key_tags: &[String],
    previous_index: Option<f64>,
    config: &StabilityConfig,
) -> StabilityIndex {
    let mut penalties = Vec::new();

    for tag in key_tags {
        let feature = format!("{}_std_dev", tag);
        let scale = config
            .variable_scale
            .get(tag)
            .copied()
            .unwrap_or(config.default_scale)
            .max(f64::EPSILON);

        for vector in vectors {
            if let Some(std_dev) = vector.get(&feature) {
                penalties.push((std_dev / scale * 100.0).clamp(0.0, 100.0));
            }
        }
    }

    // With no variance observed yet the process has shown nothing unstable;
    // hold the previous index rather than inventing a penalty.
    let index = if penalties.is_empty() {
        previous_index.unwrap_or(100.0)
    } else {
        100.0 - penalties.iter().sum::<f64>() / penalties.len() as f64
    };

    let trend = match previous_index {
        Some(prev) if index - prev >= config.trend_delta => Trend::Improving,
        Some(prev) if prev - index >= config.trend_delta => Trend::Declining,
        _ => Trend::Stable,
    };

    StabilityIndex { index, trend }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureValue;

    fn vector_with_std(tag: &str, std_dev: f64) -> FeatureVector {
        let mut features = BTreeMap::new();
        features.insert(format!("{}_std_dev", tag), FeatureValue::Value(std_dev));
        FeatureVector {
            entity_id: "CDU-101".to_string(),
            window_start: 0,
            window_end: 3600,
            features,
        }
    }

    #[test]
    fn test_index_decreases_with_variance() {
        let config = StabilityConfig::default();
        let tags = vec!["pressure".to_string()];

        let calm = vector_with_std("pressure", 0.5);
        let noisy = vector_with_std("pressure", 4.0);

        let calm_index = compute_stability(&[&calm], &tags, None, &config).index;
        let noisy_index = compute_stability(&[&noisy], &tags, None, &config).index;

        assert!(calm_index > noisy_index);
        assert!((0.0..=100.0).contains(&calm_index));
        assert!((0.0..=100.0).contains(&noisy_index));
    }

    #[test]
    fn test_per_variable_scaling_constant() {
        let mut config = StabilityConfig::default();
        config
            .variable_scale
            .insert("pressure".to_string(), 10.0);
        let tags = vec!["pressure".to_string()];

        // std_dev equal to the scaling constant exhausts the penalty.
        let vector = vector_with_std("pressure", 10.0);
        let result = compute_stability(&[&vector], &tags, None, &config);
        assert!((result.index - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_transitions() {
        let config = StabilityConfig {
            trend_delta: 2.0,
            ..Default::default()
        };
        let tags = vec!["pressure".to_string()];
        let vector = vector_with_std("pressure", 1.0);
        let index = compute_stability(&[&vector], &tags, None, &config).index;

        let improving =
            compute_stability(&[&vector], &tags, Some(index - 5.0), &config);
        assert_eq!(improving.trend, Trend::Improving);

        let declining =
            compute_stability(&[&vector], &tags, Some(index + 5.0), &config);
        assert_eq!(declining.trend, Trend::Declining);

        let stable = compute_stability(&[&vector], &tags, Some(index + 1.0), &config);
        assert_eq!(stable.trend, Trend::Stable);
    }

    #[test]
    fn test_no_data_holds_previous_index() {
        let config = StabilityConfig::default();
        let tags = vec!["pressure".to_string()];

        let result = compute_stability(&[], &tags, Some(82.5), &config);
        assert_eq!(result.index, 82.5);
        assert_eq!(result.trend, Trend::Stable);
    }
}
