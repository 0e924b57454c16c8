//! Plant analytics engine
//!
//! Ingests process telemetry, runs the periodic scoring cycle and serves
//! read-only KPI/prediction snapshots, alerts, health and metrics.

use analytics_lib::{
    aggregate::{AggregatorConfig, TAG_STATS},
    alerts::AlertBook,
    cycle::{CycleConfig, ScoringCycle},
    health::{components, HealthRegistry},
    kpi::{FinancialConfig, OeeConfig, StabilityConfig},
    energy::EnergyConfig,
    observability::{EngineMetrics, StructuredLogger},
    publish::{LoggingSink, Publisher, SnapshotStore},
    risk::{LogisticScorer, ModelStore, ModelStoreConfig, ModelWorker, RiskScorer},
    store::{StoreConfig, TelemetryStore},
    PlantMetadata,
};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting analytics-engine");

    let config = config::EngineConfig::load()?;
    info!(plant_id = %config.plant_id, "Engine configured");

    let metadata = config.load_metadata().unwrap_or_else(|e| {
        warn!(error = %e, "No plant metadata, starting with an empty plant");
        PlantMetadata::default()
    });
    info!(
        units = metadata.units.len(),
        equipment = metadata.equipment.len(),
        "Plant metadata loaded"
    );

    // Health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::TELEMETRY_STORE).await;
    health_registry.register(components::SCORING_CYCLE).await;
    health_registry.register(components::RISK_MODEL).await;
    health_registry.register(components::PUBLISH_SINK).await;

    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(&config.plant_id);

    // Shared pipeline state
    let store = Arc::new(TelemetryStore::new(StoreConfig {
        retention: Duration::from_secs(config.retention_minutes * 60),
        ..Default::default()
    }));
    let snapshots = Arc::new(SnapshotStore::new());
    let alerts = Arc::new(AlertBook::new());
    let publisher = Arc::new(Publisher::new(Arc::new(LoggingSink)));

    let (shutdown_tx, _) = broadcast::channel(1);

    // Failure-risk scorer: ONNX model when available, heuristic otherwise.
    let scorer: Arc<RwLock<Arc<dyn RiskScorer>>> =
        Arc::new(RwLock::new(Arc::new(LogisticScorer)));

    if let Some(ref model_path) = config.model_path {
        let artifact_path = PathBuf::from(model_path);
        let model_dir = artifact_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let model_store = Arc::new(ModelStore::new(ModelStoreConfig {
            model_dir,
            ..Default::default()
        })?);

        let feature_names = model_feature_names(&metadata);
        let worker = ModelWorker::new(model_store, artifact_path, feature_names, scorer.clone());

        match worker.load_now().await {
            Ok(()) => {
                let source = scorer.read().await.source();
                metrics.set_model_source(&source);
                health_registry.set_healthy(components::RISK_MODEL).await;
            }
            Err(e) => {
                warn!(error = %e, "Model load failed, scoring with heuristic fallback");
                metrics.set_model_source("heuristic");
                health_registry
                    .set_degraded(components::RISK_MODEL, format!("fallback in use: {e}"))
                    .await;
            }
        }

        tokio::spawn(worker.run(shutdown_tx.subscribe()));
    } else {
        metrics.set_model_source("heuristic");
        health_registry
            .set_degraded(components::RISK_MODEL, "no model configured")
            .await;
    }

    logger.log_startup(ENGINE_VERSION, &scorer.read().await.source());

    // Background scoring cycle
    let cycle = Arc::new(ScoringCycle::new(
        store.clone(),
        metadata,
        scorer,
        alerts.clone(),
        snapshots.clone(),
        publisher,
        cycle_config(&config),
    ));
    tokio::spawn(cycle.run(shutdown_tx.subscribe()));

    // API server
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        store,
        snapshots,
        alerts,
    ));
    let _api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    health_registry.set_ready(true).await;

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(());
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}

/// Input feature order for the ONNX model: every equipment sensor stat,
/// sorted and deduplicated so the ordering is stable across restarts
fn model_feature_names(metadata: &PlantMetadata) -> Vec<String> {
    let mut names: Vec<String> = metadata
        .equipment
        .iter()
        .flat_map(|e| e.sensor_tags.iter())
        .flat_map(|tag| TAG_STATS.iter().map(move |stat| format!("{}_{}", tag, stat)))
        .collect();
    names.sort();
    names.dedup();
    names
}

fn cycle_config(config: &config::EngineConfig) -> CycleConfig {
    CycleConfig {
        plant_id: config.plant_id.clone(),
        interval: Duration::from_secs(config.cycle_interval_secs),
        aggregator: AggregatorConfig {
            window: Duration::from_secs(config.window_minutes * 60),
            min_samples: config.min_samples,
        },
        oee: OeeConfig {
            degraded_composite: config.oee_degraded_composite,
        },
        stability: StabilityConfig {
            trend_delta: config.stability_trend_delta,
            ..Default::default()
        },
        financial: FinancialConfig {
            energy_price_usd_per_kwh: config.energy_price_usd_per_kwh,
        },
        energy: EnergyConfig {
            horizon_hours: config.energy_horizon_hours,
        },
        anomaly_threshold: config.anomaly_threshold,
        high_risk_threshold: config.high_risk_threshold,
        low_stability_threshold: config.low_stability_threshold,
        low_efficiency_threshold: config.low_efficiency_threshold,
        history_limit: 24,
    }
}
