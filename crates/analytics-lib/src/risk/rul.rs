//! Remaining-useful-life estimation
//!
//! Linear extrapolation of the dominant degrading sensor to its failure
//! threshold. A tag is degrading when its windowed mean sits below the
//! threshold and its first-difference rate-of-change is positive; the
//! dominant one is whichever projects failure soonest.

use crate::models::{EquipmentMeta, FeatureVector};

/// Estimate hours until the dominant degrading sensor crosses its
/// failure threshold
///
/// `None` when no configured tag exhibits degradation over the window.
/// A mean already at or past its threshold yields zero.
pub fn estimate_rul(equipment: &EquipmentMeta, vector: &FeatureVector) -> Option<f64> {
    let mut soonest: Option<f64> = None;

    for (tag, threshold) in &equipment.failure_thresholds {
        let mean = match vector.get(&format!("{}_mean", tag)) {
            Some(v) => v,
            None => continue,
        };

        if mean >= *threshold {
            return Some(0.0);
        }

        let rate_per_hour = match vector.get(&format!("{}_roc", tag)) {
            Some(v) if v > 0.0 => v,
            _ => continue,
        };

        let hours = (threshold - mean) / rate_per_hour;
        soonest = Some(match soonest {
            Some(current) => current.min(hours),
            None => hours,
        });
    }

    soonest
}
