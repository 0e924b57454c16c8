//! Periodic scoring cycle
//!
//! Runs the whole pipeline on a fixed interval, decoupled from any request
//! path: aggregate windows into feature vectors, compute KPIs, score
//! energy and failure risk, evaluate anomalies, raise alerts and publish
//! one atomic snapshot. Only one cycle runs at a time; a cycle that
//! overruns its interval causes the missed ticks to be skipped with a
//! logged backlog warning rather than queued. Per-entity failures are
//! isolated: one unscoreable equipment never blocks the rest of the cycle.

use crate::aggregate::{Aggregator, AggregatorConfig};
use crate::alerts::AlertBook;
use crate::anomaly::{AnomalyDetector, RollingBaseline, DEFAULT_ANOMALY_THRESHOLD};
use crate::energy::{EnergyConfig, EnergyScorer};
use crate::error::AnalyticsError;
use crate::explain::{self, Attributor, ZScoreAttributor};
use crate::kpi::{
    compute_oee, compute_stability, daily_loss, throughput_loss, FinancialConfig, OeeConfig,
    OeeInputs, StabilityConfig,
};
use crate::models::{
    AdvancedStats, AlertCondition, AlertSeverity, EquipmentMeta, FailurePrediction, FeatureValue,
    FeatureVector, HistoryPoint, OeeScope, PlantMetadata, UnitMeta,
};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::publish::{EngineSnapshot, Publisher, SnapshotStore};
use crate::risk::{self, LogisticScorer, RiskScorer};
use crate::store::TelemetryStore;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default scoring interval (5 minutes)
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Configuration for the scoring cycle
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Identifier of the plant, attached to every structured log event
    pub plant_id: String,
    /// Interval between cycles
    pub interval: Duration,
    pub aggregator: AggregatorConfig,
    pub oee: OeeConfig,
    pub stability: StabilityConfig,
    pub financial: FinancialConfig,
    pub energy: EnergyConfig,
    /// RMS z-distance above which a feature vector is anomalous
    pub anomaly_threshold: f64,
    /// Failure probability above which an alert is raised
    pub high_risk_threshold: f64,
    /// Stability index below which an alert is raised
    pub low_stability_threshold: f64,
    /// Efficiency score below which an alert is raised
    pub low_efficiency_threshold: f64,
    /// Chart points retained in the snapshot
    pub history_limit: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            plant_id: "plant".to_string(),
            interval: DEFAULT_CYCLE_INTERVAL,
            aggregator: AggregatorConfig::default(),
            oee: OeeConfig::default(),
            stability: StabilityConfig::default(),
            financial: FinancialConfig::default(),
            energy: EnergyConfig::default(),
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            high_risk_threshold: 70.0,
            low_stability_threshold: 50.0,
            low_efficiency_threshold: 65.0,
            history_limit: 24,
        }
    }
}

/// Short-memory state carried between cycles
struct CycleState {
    previous_stability: Option<f64>,
    baselines: HashMap<String, RollingBaseline>,
    previously_anomalous: HashSet<String>,
    history: VecDeque<HistoryPoint>,
    cycle_count: u64,
}

impl CycleState {
    fn new() -> Self {
        Self {
            previous_stability: None,
            baselines: HashMap::new(),
            previously_anomalous: HashSet::new(),
            history: VecDeque::new(),
            cycle_count: 0,
        }
    }
}

/// The periodic scoring cycle
pub struct ScoringCycle {
    metadata: PlantMetadata,
    aggregator: Aggregator,
    scorer: Arc<RwLock<Arc<dyn RiskScorer>>>,
    attributor: Arc<dyn Attributor>,
    detector: AnomalyDetector,
    alerts: Arc<AlertBook>,
    snapshots: Arc<SnapshotStore>,
    publisher: Arc<Publisher>,
    metrics: EngineMetrics,
    logger: StructuredLogger,
    config: CycleConfig,
    state: Mutex<CycleState>,
}

impl ScoringCycle {
    pub fn new(
        store: Arc<TelemetryStore>,
        metadata: PlantMetadata,
        scorer: Arc<RwLock<Arc<dyn RiskScorer>>>,
        alerts: Arc<AlertBook>,
        snapshots: Arc<SnapshotStore>,
        publisher: Arc<Publisher>,
        config: CycleConfig,
    ) -> Self {
        Self {
            metadata,
            aggregator: Aggregator::new(store, config.aggregator.clone()),
            scorer,
            attributor: Arc::new(ZScoreAttributor),
            detector: AnomalyDetector::new(config.anomaly_threshold),
            alerts,
            snapshots,
            publisher,
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new(config.plant_id.clone()),
            config,
            state: Mutex::new(CycleState::new()),
        }
    }

    /// Run the cycle loop until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting scoring cycle"
        );

        let mut ticker = interval(self.config.interval);
        // Bounded backlog: a cycle that overruns simply loses the ticks it
        // missed instead of queueing them.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    let now = chrono::Utc::now().timestamp();
                    let cycle = self.run_cycle(now).await;

                    let elapsed = start.elapsed();
                    if elapsed > self.config.interval {
                        self.metrics.inc_cycles_skipped();
                        self.logger.log_cycle_backlog(
                            cycle,
                            elapsed.as_millis(),
                            self.config.interval.as_millis(),
                        );
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down scoring cycle");
                    break;
                }
            }
        }
    }

    /// Execute one full cycle at the given time; returns the cycle number
    ///
    /// Never fails as a whole: per-entity errors degrade the snapshot and
    /// a publish failure leaves the sink backlog to the retry buffer while
    /// in-process readers already see the new snapshot.
    pub async fn run_cycle(&self, now: i64) -> u64 {
        let start = Instant::now();
        let mut state = self.state.lock().await;
        state.cycle_count += 1;
        let cycle = state.cycle_count;

        let mut degraded = false;

        // Windowed features per unit, shared by every KPI below.
        let unit_vectors: Vec<(&UnitMeta, FeatureVector)> = self
            .metadata
            .units
            .iter()
            .map(|unit| (unit, self.aggregator.unit_vector(unit, now)))
            .collect();

        let oee = self.compute_plant_oee(&unit_vectors, now);
        degraded |= oee.degraded;

        let stability = {
            let vectors: Vec<&FeatureVector> = unit_vectors.iter().map(|(_, v)| v).collect();
            let key_tags: Vec<String> = self
                .metadata
                .units
                .iter()
                .flat_map(|u| u.process_tags.iter().cloned())
                .collect();
            compute_stability(
                &vectors,
                &key_tags,
                state.previous_stability,
                &self.config.stability,
            )
        };
        state.previous_stability = Some(stability.index);

        let energy_scorer = EnergyScorer::new(self.config.energy.clone());
        let mut energy = Vec::new();
        for (unit, vector) in &unit_vectors {
            let avg = vector
                .features
                .get(&format!("{}_mean", unit.energy_tag))
                .copied()
                .unwrap_or(FeatureValue::Insufficient);
            match energy_scorer.score_unit(unit, avg) {
                Some(record) => energy.push(record),
                None => {
                    debug!(unit_id = %unit.unit_id, "No energy data this cycle");
                    degraded = true;
                }
            }
        }
        // Worst units first.
        energy.sort_by(|a, b| {
            a.efficiency_score
                .partial_cmp(&b.efficiency_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let financial = {
            let losses: Vec<f64> = unit_vectors
                .iter()
                .filter_map(|(unit, vector)| {
                    let actual = vector.get(&format!("{}_mean", unit.throughput_tag))?;
                    Some(throughput_loss(
                        unit.target_throughput,
                        actual,
                        unit.unit_margin,
                    ))
                })
                .collect();
            let waste_kwh: f64 = energy
                .iter()
                .map(|r| (r.avg_energy_consumption - r.benchmark).max(0.0) * 24.0)
                .sum();
            daily_loss(losses, waste_kwh, &self.config.financial)
        };

        // Failure-risk predictions, one equipment at a time so a failure
        // on one never blocks the others.
        let previous = self.snapshots.load();
        let scorer = self.scorer.read().await.clone();
        let mut predictions = Vec::new();
        let mut scored = 0usize;
        let mut unscoreable = 0usize;
        let mut anomalies = 0usize;
        let mut now_anomalous = HashSet::new();

        for equipment in &self.metadata.equipment {
            let vector = self.aggregator.equipment_vector(equipment, now);
            let baseline = state
                .baselines
                .entry(equipment.equipment_id.clone())
                .or_default();

            match self.score_equipment(equipment, &vector, baseline, scorer.as_ref(), now) {
                Ok(prediction) => {
                    if prediction.is_anomaly {
                        anomalies += 1;
                        now_anomalous.insert(equipment.equipment_id.clone());
                    }
                    self.logger.log_prediction(
                        &prediction.equipment_id,
                        prediction.failure_probability,
                        prediction.rul_hours,
                        prediction.is_anomaly,
                        prediction.confidence,
                        &prediction.model_source,
                    );
                    scored += 1;
                    predictions.push(prediction);
                }
                Err(e) => {
                    self.metrics.inc_cycle_errors();
                    degraded = true;
                    if matches!(e, AnalyticsError::Unscoreable { .. }) {
                        unscoreable += 1;
                    }
                    self.logger
                        .log_unscoreable(&equipment.equipment_id, &e.to_string());
                    // Retain the previous score rather than overwrite it
                    // with a fabricated one.
                    if let Some(prior) = previous
                        .predictions
                        .iter()
                        .find(|p| p.equipment_id == equipment.equipment_id)
                    {
                        predictions.push(prior.clone());
                    }
                }
            }

            // Fold the window into the baseline only after scoring, so a
            // vector never dampens its own anomaly signal.
            if !vector.is_unusable() {
                baseline.observe(&vector);
            }
        }

        predictions.sort_by(|a, b| {
            b.failure_probability
                .partial_cmp(&a.failure_probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        self.raise_alerts(&stability.index, &energy, &predictions, &state.previously_anomalous, now);
        state.previously_anomalous = now_anomalous;

        let history_point = HistoryPoint {
            time_label: time_label(now),
            production: unit_vectors
                .iter()
                .filter_map(|(unit, v)| v.get(&format!("{}_mean", unit.throughput_tag)))
                .sum(),
            efficiency: if energy.is_empty() {
                0.0
            } else {
                energy.iter().map(|r| r.efficiency_score).sum::<f64>() / energy.len() as f64
            },
        };
        state.history.push_back(history_point);
        while state.history.len() > self.config.history_limit {
            state.history.pop_front();
        }

        let snapshot = EngineSnapshot {
            version: 0, // assigned on publish
            generated_at: now,
            degraded,
            advanced: AdvancedStats {
                oee,
                stability,
                financial,
            },
            energy,
            predictions,
            history: state.history.iter().cloned().collect(),
        };

        let published = self.snapshots.publish(snapshot);
        self.metrics.set_snapshot_version(published.version as i64);
        self.metrics
            .set_cycle_outcome(scored as i64, unscoreable as i64, anomalies as i64);
        self.metrics.set_open_alerts(self.alerts.open_count() as i64);
        self.metrics.inc_cycles_completed();
        self.metrics
            .observe_cycle_latency(start.elapsed().as_secs_f64());

        if let Err(e) = self.publisher.publish(published.clone()).await {
            self.metrics.inc_publish_failures();
            self.logger.log_publish_failure(
                published.version,
                self.publisher.backlog().await,
                &e.to_string(),
            );
        }

        self.logger.log_cycle_complete(
            cycle,
            start.elapsed().as_millis(),
            scored,
            unscoreable,
            degraded,
        );

        cycle
    }

    fn compute_plant_oee(
        &self,
        unit_vectors: &[(&UnitMeta, FeatureVector)],
        now: i64,
    ) -> crate::models::OeeScore {
        let quality = average_feature(unit_vectors, |unit| format!("{}_mean", unit.quality_tag));
        let availability =
            average_feature(unit_vectors, |unit| format!("{}_mean", unit.availability_tag));

        let performances: Vec<f64> = unit_vectors
            .iter()
            .filter_map(|(unit, vector)| {
                let actual = vector.get(&format!("{}_mean", unit.throughput_tag))?;
                if unit.target_throughput <= f64::EPSILON {
                    return None;
                }
                Some(actual / unit.target_throughput * 100.0)
            })
            .collect();
        let performance = to_feature(&performances);

        compute_oee(
            OeeScope::Plant,
            &OeeInputs {
                quality,
                availability,
                performance,
            },
            &self.config.oee,
            now,
        )
    }

    fn score_equipment(
        &self,
        equipment: &EquipmentMeta,
        vector: &FeatureVector,
        baseline: &RollingBaseline,
        scorer: &dyn RiskScorer,
        now: i64,
    ) -> Result<FailurePrediction, AnalyticsError> {
        if vector.is_unusable() {
            return Err(AnalyticsError::Unscoreable {
                entity: equipment.equipment_id.clone(),
            });
        }

        // The anomaly verdict is computed regardless of what the
        // supervised scorer says; the two signals are reported together.
        let verdict = self.detector.evaluate(vector, baseline);

        let (failure_probability, model_source) = match scorer.score(vector, baseline) {
            Ok(p) => (p, scorer.source()),
            Err(AnalyticsError::ModelUnavailable { reason }) => {
                warn!(
                    equipment_id = %equipment.equipment_id,
                    reason = %reason,
                    "Model unavailable, using heuristic fallback"
                );
                let p = LogisticScorer.score(vector, baseline)?;
                (p, LogisticScorer.source())
            }
            Err(e) => return Err(e),
        };

        let is_anomaly = verdict.as_ref().map(|v| v.is_anomaly).unwrap_or(false);
        if let Some(v) = verdict.as_ref().filter(|v| v.is_anomaly) {
            self.logger
                .log_anomaly(&equipment.equipment_id, v.score, self.config.anomaly_threshold);
        }

        let attributions = self.attributor.attribute(vector, baseline);
        let top_drivers = explain::top_drivers(&attributions, vector);

        Ok(FailurePrediction {
            equipment_id: equipment.equipment_id.clone(),
            equipment_name: equipment.name.clone(),
            failure_probability,
            rul_hours: risk::estimate_rul(equipment, vector),
            is_anomaly,
            confidence: risk::confidence(vector),
            recommendation: explain::recommendation(
                &equipment.name,
                failure_probability,
                is_anomaly,
                top_drivers.first(),
            ),
            prediction: explain::prediction_label(failure_probability).to_string(),
            top_drivers,
            generated_at: now,
            model_source,
        })
    }

    fn raise_alerts(
        &self,
        stability_index: &f64,
        energy: &[crate::models::EnergyEfficiencyRecord],
        predictions: &[FailurePrediction],
        previously_anomalous: &HashSet<String>,
        now: i64,
    ) {
        if *stability_index < self.config.low_stability_threshold {
            let severity = if *stability_index < self.config.low_stability_threshold / 2.0 {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };
            self.raise(
                "PLANT",
                None,
                AlertCondition::LowStability,
                severity,
                format!("Process stability index at {:.1}", stability_index),
                now,
            );
        }

        for record in energy {
            if record.efficiency_score < self.config.low_efficiency_threshold {
                self.raise(
                    &record.unit_id,
                    None,
                    AlertCondition::LowEfficiency,
                    AlertSeverity::Low,
                    format!(
                        "Energy efficiency at {:.1} against benchmark {:.1}",
                        record.efficiency_score, record.benchmark
                    ),
                    now,
                );
            }
        }

        for prediction in predictions {
            if prediction.failure_probability > self.config.high_risk_threshold {
                self.raise(
                    &prediction.equipment_id,
                    None,
                    AlertCondition::HighFailureRisk,
                    AlertSeverity::High,
                    format!(
                        "Failure probability at {:.1}% for {}",
                        prediction.failure_probability, prediction.equipment_name
                    ),
                    now,
                );
            }

            // New anomalies only: a false -> true transition for an entity
            // without an open anomaly alert.
            if prediction.is_anomaly
                && !previously_anomalous.contains(&prediction.equipment_id)
            {
                self.raise(
                    &prediction.equipment_id,
                    None,
                    AlertCondition::Anomaly,
                    AlertSeverity::Medium,
                    format!(
                        "Unrecognized operating state on {}",
                        prediction.equipment_name
                    ),
                    now,
                );
            }
        }
    }

    fn raise(
        &self,
        entity_id: &str,
        tag_id: Option<&str>,
        condition: AlertCondition,
        severity: AlertSeverity,
        message: String,
        now: i64,
    ) {
        if let Some(id) = self
            .alerts
            .raise(entity_id, tag_id, condition, severity, message, now)
        {
            self.logger.log_alert_raised(
                id,
                entity_id,
                &condition.to_string(),
                &severity.to_string(),
            );
        }
    }
}

fn average_feature<F>(unit_vectors: &[(&UnitMeta, FeatureVector)], feature: F) -> FeatureValue
where
    F: Fn(&UnitMeta) -> String,
{
    let values: Vec<f64> = unit_vectors
        .iter()
        .filter_map(|(unit, vector)| vector.get(&feature(unit)))
        .collect();
    to_feature(&values)
}

fn to_feature(values: &[f64]) -> FeatureValue {
    if values.is_empty() {
        FeatureValue::Insufficient
    } else {
        FeatureValue::Value(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Hour bucket label for chart points
fn time_label(now: i64) -> String {
    chrono::DateTime::from_timestamp(now, 0)
        .map(|dt| dt.format("%H:00").to_string())
        .unwrap_or_else(|| "00:00".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Quality, Reading};
    use crate::publish::LoggingSink;
    use crate::store::StoreConfig;
    use std::collections::BTreeMap;

    const HOUR: i64 = 3600;

    fn metadata() -> PlantMetadata {
        PlantMetadata {
            units: vec![UnitMeta {
                unit_id: "CDU-101".to_string(),
                name: "Crude Distillation Unit 101".to_string(),
                target_throughput: 12_000.0,
                unit_margin: 2.0,
                energy_benchmark: 100.0,
                process_tags: vec!["pressure".to_string()],
                throughput_tag: "throughput".to_string(),
                energy_tag: "power_consumption".to_string(),
                quality_tag: "quality_score".to_string(),
                availability_tag: "availability".to_string(),
            }],
            equipment: vec![
                EquipmentMeta {
                    equipment_id: "PUMP-CDU-101".to_string(),
                    name: "Main charge pump".to_string(),
                    equipment_type: "PUMP".to_string(),
                    unit_id: "CDU-101".to_string(),
                    sensor_tags: vec!["vibration".to_string()],
                    failure_thresholds: BTreeMap::from([("vibration".to_string(), 8.0)]),
                },
                EquipmentMeta {
                    equipment_id: "COMP-FCC-201".to_string(),
                    name: "Wet gas compressor".to_string(),
                    equipment_type: "COMPRESSOR".to_string(),
                    unit_id: "FCC-201".to_string(),
                    sensor_tags: vec!["vibration_x".to_string()],
                    failure_thresholds: BTreeMap::new(),
                },
            ],
        }
    }

    fn harness(store: Arc<TelemetryStore>) -> (Arc<ScoringCycle>, Arc<AlertBook>, Arc<SnapshotStore>) {
        let alerts = Arc::new(AlertBook::new());
        let snapshots = Arc::new(SnapshotStore::new());
        let publisher = Arc::new(Publisher::new(Arc::new(LoggingSink)));
        let scorer: Arc<RwLock<Arc<dyn RiskScorer>>> =
            Arc::new(RwLock::new(Arc::new(LogisticScorer)));

        let config = CycleConfig {
            aggregator: AggregatorConfig {
                window: Duration::from_secs(HOUR as u64),
                min_samples: 3,
            },
            ..Default::default()
        };

        let cycle = Arc::new(ScoringCycle::new(
            store,
            metadata(),
            scorer,
            alerts.clone(),
            snapshots.clone(),
            publisher,
            config,
        ));
        (cycle, alerts, snapshots)
    }

    fn ingest_window(store: &TelemetryStore, unit: &str, tag: &str, end: i64, level: f64) {
        // Five samples across the hour ending at `end`, with mild spread
        // so baselines learn a non-zero variance.
        for i in 0..5 {
            store.ingest(Reading {
                unit_id: unit.to_string(),
                tag_id: tag.to_string(),
                timestamp: end - (4 - i) * 600,
                value: level + (i % 3) as f64 * 0.02 * level.abs().max(1.0),
                quality: Quality::Good,
            });
        }
    }

    fn ingest_unit_window(store: &TelemetryStore, end: i64) {
        ingest_window(store, "CDU-101", "pressure", end, 15.0);
        ingest_window(store, "CDU-101", "throughput", end, 11_000.0);
        ingest_window(store, "CDU-101", "power_consumption", end, 120.0);
        ingest_window(store, "CDU-101", "quality_score", end, 92.0);
        ingest_window(store, "CDU-101", "availability", end, 95.0);
    }

    /// Warm the pump baseline over `cycles` cycles of normal operation,
    /// with mild cycle-to-cycle drift so the baseline learns a spread.
    async fn warm_up(
        cycle: &ScoringCycle,
        store: &TelemetryStore,
        cycles: i64,
        pump_level: f64,
    ) -> i64 {
        let mut now = 0;
        for i in 1..=cycles {
            now = i * HOUR;
            let drift = pump_level * (1.0 + (i % 4) as f64 * 0.03);
            ingest_unit_window(store, now);
            ingest_window(store, "CDU-101", "vibration", now, drift);
            cycle.run_cycle(now).await;
        }
        now
    }

    #[tokio::test]
    async fn test_snapshot_published_with_kpis() {
        let store = Arc::new(TelemetryStore::new(StoreConfig::default()));
        let (cycle, _alerts, snapshots) = harness(store.clone());

        ingest_unit_window(&store, HOUR);
        ingest_window(&store, "CDU-101", "vibration", HOUR, 2.5);
        cycle.run_cycle(HOUR).await;

        let snapshot = snapshots.load();
        assert_eq!(snapshot.version, 1);

        let oee = &snapshot.advanced.oee;
        assert!(!oee.degraded);
        // quality 92-ish, availability 95-ish, performance ~91.7
        assert!(oee.composite > 0.0 && oee.composite <= 100.0);

        assert_eq!(snapshot.energy.len(), 1);
        let record = &snapshot.energy[0];
        assert_eq!(record.unit_id, "CDU-101");
        assert!(record.efficiency_score < 100.0);

        assert!(snapshot.advanced.financial.daily_loss_usd > 0.0);
        assert_eq!(snapshot.history.len(), 1);
    }

    #[tokio::test]
    async fn test_unscoreable_equipment_does_not_block_others() {
        let store = Arc::new(TelemetryStore::new(StoreConfig::default()));
        let (cycle, _alerts, snapshots) = harness(store.clone());

        // The pump gets full windows; the compressor only ever has two
        // valid samples, below the minimum for every tag.
        for i in 1..=12i64 {
            let end = i * HOUR;
            for offset in [0, 600] {
                store.ingest(Reading {
                    unit_id: "FCC-201".to_string(),
                    tag_id: "vibration_x".to_string(),
                    timestamp: end - offset,
                    value: 3.0,
                    quality: Quality::Good,
                });
            }
        }
        let now = warm_up(&cycle, &store, 12, 2.5).await;

        let snapshot = snapshots.load();
        assert!(snapshot.generated_at == now);
        let ids: Vec<&str> = snapshot
            .predictions
            .iter()
            .map(|p| p.equipment_id.as_str())
            .collect();
        assert!(ids.contains(&"PUMP-CDU-101"));
        assert!(!ids.contains(&"COMP-FCC-201"));
        assert!(snapshot.degraded);
    }

    #[tokio::test]
    async fn test_prior_prediction_retained_when_entity_goes_dark() {
        let store = Arc::new(TelemetryStore::new(StoreConfig::default()));
        let (cycle, _alerts, snapshots) = harness(store.clone());

        let now = warm_up(&cycle, &store, 12, 2.5).await;
        let before = snapshots.load();
        let prior = before
            .predictions
            .iter()
            .find(|p| p.equipment_id == "PUMP-CDU-101")
            .unwrap()
            .clone();

        // Next cycle: unit data still flows, but the pump's window is empty.
        let later = now + HOUR;
        ingest_unit_window(&store, later);
        cycle.run_cycle(later).await;

        let after = snapshots.load();
        let retained = after
            .predictions
            .iter()
            .find(|p| p.equipment_id == "PUMP-CDU-101")
            .unwrap();
        assert_eq!(retained.generated_at, prior.generated_at);
        assert!(after.degraded);
    }

    #[tokio::test]
    async fn test_anomaly_and_risk_reported_independently() {
        let store = Arc::new(TelemetryStore::new(StoreConfig::default()));
        let (cycle, _alerts, snapshots) = harness(store.clone());

        let now = warm_up(&cycle, &store, 12, 2.5).await;

        // A collapse far below anything seen in training: unmistakably
        // out of distribution, yet not a degradation-direction signal.
        let later = now + HOUR;
        ingest_unit_window(&store, later);
        ingest_window(&store, "CDU-101", "vibration", later, 0.05);
        cycle.run_cycle(later).await;

        let snapshot = snapshots.load();
        let pump = snapshot
            .predictions
            .iter()
            .find(|p| p.equipment_id == "PUMP-CDU-101")
            .unwrap();

        assert!(pump.is_anomaly, "unseen pattern must be flagged");
        assert!(
            pump.failure_probability < 30.0,
            "supervised score stayed low: {}",
            pump.failure_probability
        );
    }

    #[tokio::test]
    async fn test_high_risk_alert_deduplicated_across_cycles() {
        let store = Arc::new(TelemetryStore::new(StoreConfig::default()));
        let (cycle, alerts, _snapshots) = harness(store.clone());

        let now = warm_up(&cycle, &store, 12, 2.5).await;

        // Two consecutive cycles crossing the risk threshold; the second
        // escalates so it crosses again even after the first window has
        // widened the baseline.
        for (i, level) in [(1, 25.0), (2, 250.0)] {
            let later = now + i * HOUR;
            ingest_unit_window(&store, later);
            ingest_window(&store, "CDU-101", "vibration", later, level);
            cycle.run_cycle(later).await;
        }

        let open: Vec<_> = alerts
            .list()
            .into_iter()
            .filter(|a| {
                !a.acknowledged
                    && a.unit_id == "PUMP-CDU-101"
                    && a.condition == AlertCondition::HighFailureRisk
            })
            .collect();
        assert_eq!(open.len(), 1, "exactly one open alert after two crossings");
    }

    #[tokio::test]
    async fn test_predictions_sorted_by_probability() {
        let store = Arc::new(TelemetryStore::new(StoreConfig::default()));
        let (cycle, _alerts, snapshots) = harness(store.clone());

        // Warm both machines up.
        let mut now = 0;
        for i in 1..=12 {
            now = i * HOUR;
            let drift = 1.0 + (i % 4) as f64 * 0.03;
            ingest_unit_window(&store, now);
            ingest_window(&store, "CDU-101", "vibration", now, 2.5 * drift);
            ingest_window(&store, "FCC-201", "vibration_x", now, 3.0 * drift);
            cycle.run_cycle(now).await;
        }

        // Push only the pump into a degraded state.
        let later = now + HOUR;
        ingest_unit_window(&store, later);
        ingest_window(&store, "CDU-101", "vibration", later, 25.0);
        ingest_window(&store, "FCC-201", "vibration_x", later, 3.0);
        cycle.run_cycle(later).await;

        let snapshot = snapshots.load();
        assert_eq!(snapshot.predictions.len(), 2);
        assert_eq!(snapshot.predictions[0].equipment_id, "PUMP-CDU-101");
        assert!(
            snapshot.predictions[0].failure_probability
                >= snapshot.predictions[1].failure_probability
        );
    }

    #[test]
    fn test_time_label_formatting() {
        // 1970-01-01 13:30:00 UTC
        assert_eq!(time_label(13 * 3600 + 1800), "13:00");
    }
}
