//! Score explanation
//!
//! Ranks each feature's contribution to a risk score and renders the top
//! drivers plus a templated recommendation. The concrete attribution
//! algorithm sits behind the `Attributor` trait; the shipped
//! implementation is a local linear approximation using baseline
//! z-scores, which is additive and cheap enough to run every cycle.

use crate::anomaly::RollingBaseline;
use crate::models::{Direction, Driver, FeatureVector};

/// How many drivers a prediction reports
pub const TOP_DRIVERS: usize = 3;

/// Signed contribution of one feature to a score
#[derive(Debug, Clone)]
pub struct Attribution {
    pub feature: String,
    pub contribution: f64,
}

/// Trait for attribution implementations
pub trait Attributor: Send + Sync {
    /// Signed per-feature contributions for a scored vector
    fn attribute(&self, vector: &FeatureVector, baseline: &RollingBaseline) -> Vec<Attribution>;
}

/// Local linear attribution: each feature contributes its baseline
/// z-score, signed. Additive by construction, so percentage shares of the
/// total magnitude are well defined.
pub struct ZScoreAttributor;

impl Attributor for ZScoreAttributor {
    fn attribute(&self, vector: &FeatureVector, baseline: &RollingBaseline) -> Vec<Attribution> {
        vector
            .features
            .iter()
            .filter_map(|(name, slot)| {
                let value = slot.value()?;
                let z = baseline.z_score(name, value)?;
                Some(Attribution {
                    feature: name.clone(),
                    contribution: z,
                })
            })
            .collect()
    }
}

/// Reduce attributions to the ranked top drivers
///
/// Each driver's `contribution_pct` is its share of the total attributed
/// magnitude across *all* features, so the reported shares always sum to
/// at most 100. Direction comes from the feature's windowed
/// rate-of-change when present, else from the contribution's sign.
pub fn top_drivers(attributions: &[Attribution], vector: &FeatureVector) -> Vec<Driver> {
    let total: f64 = attributions.iter().map(|a| a.contribution.abs()).sum();
    if total < f64::EPSILON {
        return Vec::new();
    }

    let mut ranked: Vec<&Attribution> = attributions.iter().collect();
    ranked.sort_by(|a, b| {
        b.contribution
            .abs()
            .partial_cmp(&a.contribution.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ranked
        .into_iter()
        .take(TOP_DRIVERS)
        .map(|attribution| Driver {
            feature: attribution.feature.clone(),
            contribution_pct: attribution.contribution.abs() / total * 100.0,
            direction: driver_direction(attribution, vector),
        })
        .collect()
}

fn driver_direction(attribution: &Attribution, vector: &FeatureVector) -> Direction {
    let signal = roc_for_feature(&attribution.feature, vector).unwrap_or(attribution.contribution);
    if signal >= 0.0 {
        Direction::Increase
    } else {
        Direction::Decrease
    }
}

/// Rate-of-change slot for the tag a feature belongs to
fn roc_for_feature(feature: &str, vector: &FeatureVector) -> Option<f64> {
    let tag = feature.rsplit_once('_').map(|(head, _)| {
        // Stats are single suffixes except std_dev.
        head.strip_suffix("_std").unwrap_or(head)
    })?;
    vector.get(&format!("{}_roc", tag))
}

/// Probability bracket above which the operator label flips
pub const FAILURE_IMMINENT_THRESHOLD: f64 = 70.0;

/// Operator-facing label for a failure probability
pub fn prediction_label(probability: f64) -> &'static str {
    if probability >= FAILURE_IMMINENT_THRESHOLD {
        "FAILURE IMMINENT"
    } else {
        "NORMAL OPERATION"
    }
}

/// Templated maintenance recommendation
///
/// Selected from fixed probability brackets and filled in with the top
/// driver, never free-form, so the output is deterministic and testable.
pub fn recommendation(
    equipment_name: &str,
    probability: f64,
    is_anomaly: bool,
    top_driver: Option<&Driver>,
) -> String {
    let driver_clause = top_driver
        .map(|d| {
            let direction = match d.direction {
                Direction::Increase => "rising",
                Direction::Decrease => "falling",
            };
            format!(", driven by {} {}", direction, d.feature.replace('_', " "))
        })
        .unwrap_or_default();

    if probability > 80.0 {
        format!(
            "Stop {} for immediate maintenance{}",
            equipment_name, driver_clause
        )
    } else if probability > 60.0 {
        format!(
            "Schedule maintenance for {} within the next 24 hours{}",
            equipment_name, driver_clause
        )
    } else if probability > 40.0 {
        format!(
            "Monitor {} closely - moderate risk{}",
            equipment_name, driver_clause
        )
    } else if is_anomaly {
        format!(
            "Unrecognized operating state on {} - review recent process changes{}",
            equipment_name, driver_clause
        )
    } else {
        format!("{} operating normally - continue monitoring", equipment_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureValue;
    use std::collections::BTreeMap;

    fn vector(values: &[(&str, f64)]) -> FeatureVector {
        let features = values
            .iter()
            .map(|(name, v)| (name.to_string(), FeatureValue::Value(*v)))
            .collect();
        FeatureVector {
            entity_id: "PUMP-CDU-101".to_string(),
            window_start: 0,
            window_end: 3600,
            features,
        }
    }

    fn attributions(values: &[(&str, f64)]) -> Vec<Attribution> {
        values
            .iter()
            .map(|(name, c)| Attribution {
                feature: name.to_string(),
                contribution: *c,
            })
            .collect()
    }

    #[test]
    fn test_drivers_ranked_by_magnitude_and_capped() {
        let attribs = attributions(&[
            ("vibration_mean", 4.0),
            ("temperature_mean", -6.0),
            ("pressure_mean", 1.0),
            ("flow_mean", 0.5),
        ]);
        let drivers = top_drivers(&attribs, &vector(&[]));

        assert_eq!(drivers.len(), TOP_DRIVERS);
        assert_eq!(drivers[0].feature, "temperature_mean");
        assert_eq!(drivers[1].feature, "vibration_mean");
        assert_eq!(drivers[2].feature, "pressure_mean");

        for pair in drivers.windows(2) {
            assert!(pair[0].contribution_pct >= pair[1].contribution_pct);
        }
    }

    #[test]
    fn test_contribution_shares_sum_at_most_100() {
        let attribs = attributions(&[
            ("a_mean", 3.0),
            ("b_mean", 2.0),
            ("c_mean", 2.0),
            ("d_mean", 1.0),
            ("e_mean", 1.0),
        ]);
        let drivers = top_drivers(&attribs, &vector(&[]));

        let sum: f64 = drivers.iter().map(|d| d.contribution_pct).sum();
        assert!(sum <= 100.0 + 1e-9);
        // Shares are of the total magnitude, so the dropped features keep
        // the top three below 100 here.
        assert!(sum < 100.0);
    }

    #[test]
    fn test_direction_follows_rate_of_change() {
        let attribs = attributions(&[("vibration_mean", 2.5)]);
        let rising = vector(&[("vibration_roc", 0.4)]);
        let falling = vector(&[("vibration_roc", -0.4)]);

        assert_eq!(
            top_drivers(&attribs, &rising)[0].direction,
            Direction::Increase
        );
        assert_eq!(
            top_drivers(&attribs, &falling)[0].direction,
            Direction::Decrease
        );
    }

    #[test]
    fn test_std_dev_feature_maps_to_its_tag_roc() {
        let attribs = attributions(&[("vibration_std_dev", 2.0)]);
        let drivers = top_drivers(&attribs, &vector(&[("vibration_roc", -1.0)]));
        assert_eq!(drivers[0].direction, Direction::Decrease);
    }

    #[test]
    fn test_zero_attribution_yields_no_drivers() {
        let drivers = top_drivers(&[], &vector(&[]));
        assert!(drivers.is_empty());
    }

    #[test]
    fn test_recommendation_brackets() {
        assert!(recommendation("Main charge pump", 90.0, false, None).contains("immediate"));
        assert!(recommendation("Main charge pump", 65.0, false, None).contains("24 hours"));
        assert!(recommendation("Main charge pump", 50.0, false, None).contains("moderate risk"));
        assert!(recommendation("Main charge pump", 10.0, false, None).contains("normally"));
        // Anomaly with low supervised risk gets its own wording.
        assert!(
            recommendation("Main charge pump", 10.0, true, None).contains("Unrecognized")
        );
    }

    #[test]
    fn test_recommendation_is_deterministic() {
        let driver = Driver {
            feature: "vibration_mean".to_string(),
            contribution_pct: 60.0,
            direction: Direction::Increase,
        };
        let a = recommendation("Main charge pump", 85.0, false, Some(&driver));
        let b = recommendation("Main charge pump", 85.0, false, Some(&driver));
        assert_eq!(a, b);
        assert!(a.contains("rising vibration mean"));
    }

    #[test]
    fn test_prediction_label_threshold() {
        assert_eq!(prediction_label(85.0), "FAILURE IMMINENT");
        assert_eq!(prediction_label(40.0), "NORMAL OPERATION");
    }
}
