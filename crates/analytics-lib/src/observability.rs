//! Observability infrastructure for the analytics engine
//!
//! Provides:
//! - Prometheus metrics (cycle latency, ingest volume, scoring outcomes)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_gauge, GaugeVec,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for cycle latency measurements (in seconds)
const CYCLE_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    cycle_latency_seconds: Histogram,
    readings_ingested: IntCounter,
    cycles_completed: IntCounter,
    cycles_skipped: IntCounter,
    cycle_errors: IntCounter,
    publish_failures: IntCounter,
    entities_scored: IntGauge,
    entities_unscoreable: IntGauge,
    anomalies_detected: IntGauge,
    open_alerts: IntGauge,
    snapshot_version: IntGauge,
    model_source_info: GaugeVec,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "analytics_engine_cycle_latency_seconds",
                "Time spent running one full scoring cycle",
                CYCLE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            readings_ingested: register_int_counter!(
                "analytics_engine_readings_ingested_total",
                "Total raw readings accepted into the telemetry store"
            )
            .expect("Failed to register readings_ingested_total"),

            cycles_completed: register_int_counter!(
                "analytics_engine_cycles_completed_total",
                "Total scoring cycles completed and published"
            )
            .expect("Failed to register cycles_completed_total"),

            cycles_skipped: register_int_counter!(
                "analytics_engine_cycles_skipped_total",
                "Scoring cycles skipped because the previous one was still running"
            )
            .expect("Failed to register cycles_skipped_total"),

            cycle_errors: register_int_counter!(
                "analytics_engine_cycle_errors_total",
                "Per-entity scoring errors across all cycles"
            )
            .expect("Failed to register cycle_errors_total"),

            publish_failures: register_int_counter!(
                "analytics_engine_publish_failures_total",
                "Snapshot publish attempts rejected by the sink"
            )
            .expect("Failed to register publish_failures_total"),

            entities_scored: register_int_gauge!(
                "analytics_engine_entities_scored",
                "Entities that received a prediction in the last cycle"
            )
            .expect("Failed to register entities_scored"),

            entities_unscoreable: register_int_gauge!(
                "analytics_engine_entities_unscoreable",
                "Entities skipped as unscoreable in the last cycle"
            )
            .expect("Failed to register entities_unscoreable"),

            anomalies_detected: register_int_gauge!(
                "analytics_engine_anomalies_detected",
                "Entities flagged anomalous in the last cycle"
            )
            .expect("Failed to register anomalies_detected"),

            open_alerts: register_int_gauge!(
                "analytics_engine_open_alerts",
                "Alerts currently open (not acknowledged)"
            )
            .expect("Failed to register open_alerts"),

            snapshot_version: register_int_gauge!(
                "analytics_engine_snapshot_version",
                "Version of the last published snapshot"
            )
            .expect("Failed to register snapshot_version"),

            model_source_info: register_gauge_vec!(
                "analytics_engine_model_source_info",
                "Information about the active failure-risk scoring function",
                &["source"]
            )
            .expect("Failed to register model_source_info"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    pub fn inc_readings_ingested(&self, count: u64) {
        self.inner().readings_ingested.inc_by(count);
    }

    pub fn inc_cycles_completed(&self) {
        self.inner().cycles_completed.inc();
    }

    pub fn inc_cycles_skipped(&self) {
        self.inner().cycles_skipped.inc();
    }

    pub fn inc_cycle_errors(&self) {
        self.inner().cycle_errors.inc();
    }

    pub fn inc_publish_failures(&self) {
        self.inner().publish_failures.inc();
    }

    pub fn set_cycle_outcome(&self, scored: i64, unscoreable: i64, anomalies: i64) {
        self.inner().entities_scored.set(scored);
        self.inner().entities_unscoreable.set(unscoreable);
        self.inner().anomalies_detected.set(anomalies);
    }

    pub fn set_open_alerts(&self, count: i64) {
        self.inner().open_alerts.set(count);
    }

    pub fn set_snapshot_version(&self, version: i64) {
        self.inner().snapshot_version.set(version);
    }

    pub fn set_model_source(&self, source: &str) {
        self.inner().model_source_info.reset();
        self.inner()
            .model_source_info
            .with_label_values(&[source])
            .set(1.0);
    }
}

/// Structured logger for engine events
///
/// Provides consistent JSON-formatted logging for cycles, predictions,
/// anomalies and alerts.
#[derive(Clone)]
pub struct StructuredLogger {
    plant_id: String,
}

impl StructuredLogger {
    pub fn new(plant_id: impl Into<String>) -> Self {
        Self {
            plant_id: plant_id.into(),
        }
    }

    pub fn log_cycle_complete(
        &self,
        cycle: u64,
        duration_ms: u128,
        scored: usize,
        unscoreable: usize,
        degraded: bool,
    ) {
        info!(
            event = "cycle_complete",
            plant = %self.plant_id,
            cycle = cycle,
            duration_ms = duration_ms,
            entities_scored = scored,
            entities_unscoreable = unscoreable,
            degraded = degraded,
            "Scoring cycle complete"
        );
    }

    pub fn log_cycle_backlog(&self, cycle: u64, duration_ms: u128, interval_ms: u128) {
        warn!(
            event = "cycle_backlog",
            plant = %self.plant_id,
            cycle = cycle,
            duration_ms = duration_ms,
            interval_ms = interval_ms,
            "Scoring cycle overran its interval, skipping missed ticks"
        );
    }

    pub fn log_prediction(
        &self,
        equipment_id: &str,
        failure_probability: f64,
        rul_hours: Option<f64>,
        is_anomaly: bool,
        confidence: f64,
        model_source: &str,
    ) {
        info!(
            event = "prediction_generated",
            plant = %self.plant_id,
            equipment_id = %equipment_id,
            failure_probability = failure_probability,
            rul_hours = ?rul_hours,
            is_anomaly = is_anomaly,
            confidence = confidence,
            model_source = %model_source,
            "Generated failure prediction"
        );
    }

    pub fn log_anomaly(&self, equipment_id: &str, score: f64, threshold: f64) {
        warn!(
            event = "anomaly_detected",
            plant = %self.plant_id,
            equipment_id = %equipment_id,
            score = score,
            threshold = threshold,
            "Out-of-distribution operating state detected"
        );
    }

    pub fn log_unscoreable(&self, equipment_id: &str, reason: &str) {
        warn!(
            event = "entity_unscoreable",
            plant = %self.plant_id,
            equipment_id = %equipment_id,
            reason = %reason,
            "Equipment skipped this cycle, previous score retained"
        );
    }

    pub fn log_alert_raised(&self, alert_id: u64, entity_id: &str, condition: &str, severity: &str) {
        warn!(
            event = "alert_raised",
            plant = %self.plant_id,
            alert_id = alert_id,
            entity_id = %entity_id,
            condition = %condition,
            severity = %severity,
            "Alert raised"
        );
    }

    pub fn log_publish_failure(&self, version: u64, buffered: usize, error: &str) {
        warn!(
            event = "publish_failure",
            plant = %self.plant_id,
            snapshot_version = version,
            buffered = buffered,
            error = %error,
            "Snapshot publish failed, buffered for retry"
        );
    }

    pub fn log_model_swap(&self, old_source: &str, new_source: &str) {
        info!(
            event = "model_swapped",
            plant = %self.plant_id,
            old_source = %old_source,
            new_source = %new_source,
            "Failure-risk scoring function swapped"
        );
    }

    pub fn log_startup(&self, version: &str, model_source: &str) {
        info!(
            event = "engine_started",
            plant = %self.plant_id,
            engine_version = %version,
            model_source = %model_source,
            "Analytics engine started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "engine_shutdown",
            plant = %self.plant_id,
            reason = %reason,
            "Analytics engine shutting down"
        );
    }
}
