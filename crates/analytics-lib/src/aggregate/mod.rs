//! Windowed feature aggregation
//!
//! Builds per-entity feature vectors from the telemetry window store using
//! a fixed feature set: mean, standard deviation, min, max and the
//! first-difference rate-of-change over the window. Aggregation is pure:
//! recomputing from the same window contents yields an identical vector.

use crate::models::{EquipmentMeta, FeatureValue, FeatureVector, Reading, UnitMeta};
use crate::store::TelemetryStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Minimum valid samples a tag needs before its slots carry values
pub const MIN_SAMPLES: usize = 3;

const SECS_PER_HOUR: f64 = 3600.0;

/// Per-tag statistics derived from one window
pub const TAG_STATS: [&str; 5] = ["mean", "std_dev", "min", "max", "roc"];

/// Configuration for feature aggregation
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Window length pulled from the store for each cycle
    pub window: Duration,
    /// Minimum valid samples per tag
    pub min_samples: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(4 * 60 * 60),
            min_samples: MIN_SAMPLES,
        }
    }
}

/// Builds feature vectors from the telemetry window store
pub struct Aggregator {
    store: Arc<TelemetryStore>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(store: Arc<TelemetryStore>, config: AggregatorConfig) -> Self {
        Self { store, config }
    }

    /// Feature vector for a unit, covering its process tags plus the
    /// throughput, energy, quality and availability tags.
    pub fn unit_vector(&self, unit: &UnitMeta, now: i64) -> FeatureVector {
        let mut tags: Vec<String> = unit.process_tags.clone();
        for extra in [
            &unit.throughput_tag,
            &unit.energy_tag,
            &unit.quality_tag,
            &unit.availability_tag,
        ] {
            if !tags.contains(extra) {
                tags.push(extra.clone());
            }
        }
        self.vector_for_tags(&unit.unit_id, &unit.unit_id, &tags, now)
    }

    /// Feature vector for a piece of equipment over its sensor tags
    pub fn equipment_vector(&self, equipment: &EquipmentMeta, now: i64) -> FeatureVector {
        self.vector_for_tags(
            &equipment.equipment_id,
            &equipment.unit_id,
            &equipment.sensor_tags,
            now,
        )
    }

    fn vector_for_tags(
        &self,
        entity_id: &str,
        unit_id: &str,
        tags: &[String],
        now: i64,
    ) -> FeatureVector {
        let mut features = BTreeMap::new();

        for tag in tags {
            let readings = self.store.window(unit_id, tag, self.config.window, now);
            let slots = tag_features(&readings, self.config.min_samples);
            for (stat, value) in TAG_STATS.iter().zip(slots) {
                features.insert(format!("{}_{}", tag, stat), value);
            }
        }

        FeatureVector {
            entity_id: entity_id.to_string(),
            window_start: now - self.config.window.as_secs() as i64,
            window_end: now,
            features,
        }
    }
}

/// Compute the fixed stat set for one tag window
///
/// Order matches [`TAG_STATS`]. All five slots are `Insufficient` when the
/// window holds fewer than `min_samples` valid readings.
fn tag_features(readings: &[Reading], min_samples: usize) -> [FeatureValue; 5] {
    if readings.len() < min_samples {
        return [FeatureValue::Insufficient; 5];
    }

    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();

    let mean = mean(&values);
    let std_dev = std_dev(&values);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let roc = first_difference_rate(readings)
        .map(FeatureValue::Value)
        .unwrap_or(FeatureValue::Insufficient);

    [
        FeatureValue::Value(mean),
        FeatureValue::Value(std_dev),
        FeatureValue::Value(min),
        FeatureValue::Value(max),
        roc,
    ]
}

/// Arithmetic mean of a non-empty slice
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (Bessel's correction)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// First-difference rate-of-change in value units per hour
///
/// Successive differences over a shared time axis telescope, so this is
/// `(last - first) / elapsed`. `None` when the window spans zero time.
pub fn first_difference_rate(readings: &[Reading]) -> Option<f64> {
    let first = readings.first()?;
    let last = readings.last()?;
    let elapsed = (last.timestamp - first.timestamp) as f64;
    if elapsed <= f64::EPSILON {
        return None;
    }
    Some((last.value - first.value) / elapsed * SECS_PER_HOUR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quality;
    use crate::store::StoreConfig;

    fn seeded_store(samples: &[(&str, &str, i64, f64)]) -> Arc<TelemetryStore> {
        let store = Arc::new(TelemetryStore::new(StoreConfig::default()));
        for (unit, tag, ts, value) in samples {
            store.ingest(Reading {
                unit_id: unit.to_string(),
                tag_id: tag.to_string(),
                timestamp: *ts,
                value: *value,
                quality: Quality::Good,
            });
        }
        store
    }

    fn test_equipment() -> EquipmentMeta {
        EquipmentMeta {
            equipment_id: "PUMP-CDU-101".to_string(),
            name: "Main charge pump".to_string(),
            equipment_type: "PUMP".to_string(),
            unit_id: "CDU-101".to_string(),
            sensor_tags: vec!["vibration".to_string(), "temperature".to_string()],
            failure_thresholds: BTreeMap::new(),
        }
    }

    #[test]
    fn test_known_statistics() {
        let store = seeded_store(&[
            ("CDU-101", "vibration", 0, 1.0),
            ("CDU-101", "vibration", 3600, 2.0),
            ("CDU-101", "vibration", 7200, 3.0),
        ]);
        let aggregator = Aggregator::new(
            store,
            AggregatorConfig {
                window: Duration::from_secs(8000),
                min_samples: 3,
            },
        );

        let vector = aggregator.equipment_vector(&test_equipment(), 7200);

        assert_eq!(vector.get("vibration_mean"), Some(2.0));
        assert_eq!(vector.get("vibration_min"), Some(1.0));
        assert_eq!(vector.get("vibration_max"), Some(3.0));
        assert!((vector.get("vibration_std_dev").unwrap() - 1.0).abs() < 1e-9);
        // 2.0 units over 2 hours
        assert!((vector.get("vibration_roc").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_samples_marked_not_zeroed() {
        let store = seeded_store(&[
            ("CDU-101", "vibration", 0, 1.0),
            ("CDU-101", "vibration", 60, 2.0),
        ]);
        let aggregator = Aggregator::new(store, AggregatorConfig::default());

        let vector = aggregator.equipment_vector(&test_equipment(), 60);

        for stat in TAG_STATS {
            let slot = vector.features.get(&format!("vibration_{}", stat)).unwrap();
            assert!(slot.is_insufficient(), "{} should be insufficient", stat);
        }
        // Slots for the tag with no readings at all are also marked.
        assert!(vector
            .features
            .get("temperature_mean")
            .unwrap()
            .is_insufficient());
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let store = seeded_store(&[
            ("CDU-101", "vibration", 0, 1.4),
            ("CDU-101", "vibration", 600, 1.9),
            ("CDU-101", "vibration", 1200, 2.7),
            ("CDU-101", "temperature", 0, 70.0),
            ("CDU-101", "temperature", 600, 72.0),
            ("CDU-101", "temperature", 1200, 74.5),
        ]);
        let aggregator = Aggregator::new(store, AggregatorConfig::default());

        let first = aggregator.equipment_vector(&test_equipment(), 1200);
        let second = aggregator.equipment_vector(&test_equipment(), 1200);

        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_elapsed_roc_is_insufficient() {
        let readings: Vec<Reading> = (0..3)
            .map(|i| Reading {
                unit_id: "CDU-101".to_string(),
                tag_id: "flow".to_string(),
                timestamp: 100,
                value: i as f64,
                quality: Quality::Good,
            })
            .collect();

        assert!(first_difference_rate(&readings).is_none());
        let slots = tag_features(&readings, 3);
        assert!(matches!(slots[4], FeatureValue::Insufficient));
        assert!(matches!(slots[0], FeatureValue::Value(_)));
    }

    #[test]
    fn test_std_dev_of_constant_series_is_zero() {
        assert_eq!(std_dev(&[5.0, 5.0, 5.0, 5.0]), 0.0);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.138).abs() < 0.01);
    }
}
