//! Unsupervised anomaly detection
//!
//! Maintains a per-feature baseline of normal operation and flags feature
//! vectors whose distance from that baseline exceeds a configured
//! threshold. Runs independently of the supervised failure-risk score so
//! failure modes absent from the training data still get caught; a low
//! failure probability together with `is_anomaly=true` is an expected
//! combination, not a contradiction.

use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum observed vectors before the baseline is usable
pub const MIN_BASELINE_SAMPLES: u64 = 10;

/// Default anomaly threshold on the RMS z-distance
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 3.0;

/// Welford accumulator for one feature
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FeatureStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl FeatureStats {
    fn observe(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).sqrt()
    }
}

/// Per-feature baseline of historically normal operation
///
/// Updated online; serializable so a baseline learned in one run can be
/// carried into the next.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollingBaseline {
    stats: BTreeMap<String, FeatureStats>,
    observed: u64,
}

impl RollingBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one feature vector into the baseline. Insufficient slots are
    /// skipped; they carry no information about normal operation.
    pub fn observe(&mut self, vector: &FeatureVector) {
        for (name, slot) in &vector.features {
            if let Some(value) = slot.value() {
                self.stats.entry(name.clone()).or_default().observe(value);
            }
        }
        self.observed += 1;
    }

    /// True once enough vectors have been seen for distances to mean much
    pub fn is_ready(&self) -> bool {
        self.observed >= MIN_BASELINE_SAMPLES
    }

    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Z-score of a value against the baseline for one feature
    ///
    /// `None` for unknown features; a near-zero spread yields 0 rather
    /// than an unbounded score.
    pub fn z_score(&self, feature: &str, value: f64) -> Option<f64> {
        let stats = self.stats.get(feature)?;
        let std_dev = stats.std_dev();
        if std_dev < f64::EPSILON {
            return Some(0.0);
        }
        Some((value - stats.mean) / std_dev)
    }
}

/// Outcome of an anomaly evaluation
#[derive(Debug, Clone)]
pub struct AnomalyVerdict {
    /// RMS of per-feature z-scores
    pub score: f64,
    pub is_anomaly: bool,
    /// Features that contributed to the distance
    pub features_checked: usize,
}

/// Flags out-of-distribution feature vectors against a baseline
pub struct AnomalyDetector {
    threshold: f64,
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Evaluate a vector against the baseline
    ///
    /// Returns `None` until the baseline is ready or when no feature
    /// overlaps it; a verdict is never fabricated from thin data.
    pub fn evaluate(
        &self,
        vector: &FeatureVector,
        baseline: &RollingBaseline,
    ) -> Option<AnomalyVerdict> {
        if !baseline.is_ready() {
            return None;
        }

        let mut sum_sq = 0.0;
        let mut checked = 0usize;

        for (name, slot) in &vector.features {
            if let Some(value) = slot.value() {
                if let Some(z) = baseline.z_score(name, value) {
                    sum_sq += z * z;
                    checked += 1;
                }
            }
        }

        if checked == 0 {
            return None;
        }

        let score = (sum_sq / checked as f64).sqrt();
        Some(AnomalyVerdict {
            score,
            is_anomaly: score > self.threshold,
            features_checked: checked,
        })
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ANOMALY_THRESHOLD)
    }
}
