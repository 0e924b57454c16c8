//! Telemetry window store
//!
//! Holds the most recent readings per (unit, tag), ordered by time.
//! Ingestion from many producers runs concurrently against sharded map
//! entries; window queries hand out owned copies so aggregation never
//! holds a lock on the live series.

use crate::models::{Quality, Reading, TagKey};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;

/// Default retention window (24 hours)
const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;

/// Default cap on samples kept per series
const DEFAULT_MAX_SERIES_LEN: usize = 10_000;

/// Configuration for the telemetry store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Retention window; readings older than this (relative to the newest
    /// reading in the series) are evicted on ingest.
    pub retention: Duration,
    /// Hard cap per series, enforced with FIFO eviction.
    pub max_series_len: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            max_series_len: DEFAULT_MAX_SERIES_LEN,
        }
    }
}

/// Concurrent per-(unit, tag) rolling window store
pub struct TelemetryStore {
    series: DashMap<TagKey, VecDeque<Reading>>,
    config: StoreConfig,
}

impl TelemetryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            series: DashMap::new(),
            config,
        }
    }

    /// Append a reading to its series
    ///
    /// An unknown (unit, tag) pair is silently created on first ingest so
    /// schema drift from the field never errors. Slightly out-of-order
    /// arrivals are shifted into place; entries past retention or the
    /// series cap are evicted from the front.
    pub fn ingest(&self, reading: Reading) {
        let key = TagKey::new(reading.unit_id.clone(), reading.tag_id.clone());
        let mut series = self.series.entry(key).or_default();

        series.push_back(reading);

        // Telemetry is nearly sorted; bubble the new entry backwards only
        // as far as needed.
        let mut idx = series.len() - 1;
        while idx > 0 && series[idx - 1].timestamp > series[idx].timestamp {
            series.swap(idx - 1, idx);
            idx -= 1;
        }

        let newest = series.back().map(|r| r.timestamp).unwrap_or(0);
        let cutoff = newest - self.config.retention.as_secs() as i64;
        while let Some(front) = series.front() {
            if front.timestamp < cutoff {
                series.pop_front();
            } else {
                break;
            }
        }

        while series.len() > self.config.max_series_len {
            series.pop_front();
        }
    }

    /// Time-ordered copy of the readings in `[now - duration, now]`
    ///
    /// Readings with `quality=bad` are excluded; use [`Self::window_all`]
    /// when they are explicitly wanted (e.g. gap diagnostics).
    pub fn window(&self, unit_id: &str, tag_id: &str, duration: Duration, now: i64) -> Vec<Reading> {
        self.window_inner(unit_id, tag_id, duration, now, false)
    }

    /// Same as [`Self::window`] but includes bad-quality readings
    pub fn window_all(
        &self,
        unit_id: &str,
        tag_id: &str,
        duration: Duration,
        now: i64,
    ) -> Vec<Reading> {
        self.window_inner(unit_id, tag_id, duration, now, true)
    }

    fn window_inner(
        &self,
        unit_id: &str,
        tag_id: &str,
        duration: Duration,
        now: i64,
        include_bad: bool,
    ) -> Vec<Reading> {
        let key = TagKey::new(unit_id, tag_id);
        let start = now - duration.as_secs() as i64;

        match self.series.get(&key) {
            Some(series) => series
                .iter()
                .filter(|r| r.timestamp >= start && r.timestamp <= now)
                .filter(|r| include_bad || r.quality == Quality::Good)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of tracked (unit, tag) series
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Total samples held across all series
    pub fn sample_count(&self) -> usize {
        self.series.iter().map(|s| s.len()).sum()
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(unit: &str, tag: &str, ts: i64, value: f64, quality: Quality) -> Reading {
        Reading {
            unit_id: unit.to_string(),
            tag_id: tag.to_string(),
            timestamp: ts,
            value,
            quality,
        }
    }

    #[test]
    fn test_unknown_series_created_on_first_ingest() {
        let store = TelemetryStore::default();
        assert_eq!(store.series_count(), 0);

        store.ingest(reading("CDU-101", "new_field_tag", 100, 1.0, Quality::Good));

        assert_eq!(store.series_count(), 1);
        assert_eq!(store.sample_count(), 1);
    }

    #[test]
    fn test_window_bounds_and_ordering() {
        let store = TelemetryStore::default();
        for ts in [100, 300, 200, 500, 400] {
            store.ingest(reading("CDU-101", "temp", ts, ts as f64, Quality::Good));
        }

        let window = store.window("CDU-101", "temp", Duration::from_secs(300), 500);
        let timestamps: Vec<i64> = window.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![200, 300, 400, 500]);
    }

    #[test]
    fn test_bad_quality_retained_but_excluded_by_default() {
        let store = TelemetryStore::default();
        store.ingest(reading("CDU-101", "temp", 100, 1.0, Quality::Good));
        store.ingest(reading("CDU-101", "temp", 200, 2.0, Quality::Bad));
        store.ingest(reading("CDU-101", "temp", 300, 3.0, Quality::Good));

        let good = store.window("CDU-101", "temp", Duration::from_secs(600), 300);
        assert_eq!(good.len(), 2);

        let all = store.window_all("CDU-101", "temp", Duration::from_secs(600), 300);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_retention_eviction() {
        let store = TelemetryStore::new(StoreConfig {
            retention: Duration::from_secs(100),
            max_series_len: 1000,
        });

        for ts in (0..300).step_by(10) {
            store.ingest(reading("CDU-101", "temp", ts as i64, 1.0, Quality::Good));
        }

        // Newest sample is at 290; anything before 190 must be gone.
        let all = store.window_all("CDU-101", "temp", Duration::from_secs(1000), 290);
        assert!(all.iter().all(|r| r.timestamp >= 190));
    }

    #[test]
    fn test_series_length_cap() {
        let store = TelemetryStore::new(StoreConfig {
            retention: Duration::from_secs(1_000_000),
            max_series_len: 5,
        });

        for ts in 0..20 {
            store.ingest(reading("CDU-101", "temp", ts, 1.0, Quality::Good));
        }

        assert_eq!(store.sample_count(), 5);
    }

    #[test]
    fn test_window_on_unknown_series_is_empty() {
        let store = TelemetryStore::default();
        let window = store.window("FCC-201", "missing", Duration::from_secs(60), 100);
        assert!(window.is_empty());
    }
}
