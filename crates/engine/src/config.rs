//! Engine configuration

use anyhow::{Context, Result};
use serde::Deserialize;

/// Engine configuration, loaded from `ENGINE_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Plant identifier, attached to every structured log event
    #[serde(default = "default_plant_id")]
    pub plant_id: String,

    /// API server port for ingest/snapshots/health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Scoring cycle interval in seconds
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,

    /// Aggregation window in minutes
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,

    /// Telemetry retention in minutes
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u64,

    /// Minimum valid samples per tag before its feature slots carry values
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// RMS z-distance above which a feature vector is anomalous
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,

    /// Failure probability above which an alert is raised
    #[serde(default = "default_high_risk_threshold")]
    pub high_risk_threshold: f64,

    /// Stability index below which an alert is raised
    #[serde(default = "default_low_stability_threshold")]
    pub low_stability_threshold: f64,

    /// Efficiency score below which an alert is raised
    #[serde(default = "default_low_efficiency_threshold")]
    pub low_efficiency_threshold: f64,

    /// Horizon in hours for energy savings estimates
    #[serde(default = "default_energy_horizon")]
    pub energy_horizon_hours: f64,

    /// Industrial energy price used for loss estimates
    #[serde(default = "default_energy_price")]
    pub energy_price_usd_per_kwh: f64,

    /// OEE composite reported when a component is missing
    #[serde(default = "default_oee_degraded_composite")]
    pub oee_degraded_composite: f64,

    /// Minimum stability index change before the trend leaves stable
    #[serde(default = "default_stability_trend_delta")]
    pub stability_trend_delta: f64,

    /// Path to the plant metadata JSON file (units, equipment, benchmarks)
    #[serde(default = "default_metadata_path")]
    pub metadata_path: String,

    /// Path to the ONNX risk model artifact; heuristic fallback when unset
    #[serde(default)]
    pub model_path: Option<String>,
}

fn default_plant_id() -> String {
    std::env::var("PLANT_ID").unwrap_or_else(|_| "plant".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_cycle_interval() -> u64 {
    300
}

fn default_window_minutes() -> u64 {
    240
}

fn default_retention_minutes() -> u64 {
    24 * 60
}

fn default_min_samples() -> usize {
    3
}

fn default_anomaly_threshold() -> f64 {
    3.0
}

fn default_high_risk_threshold() -> f64 {
    70.0
}

fn default_low_stability_threshold() -> f64 {
    50.0
}

fn default_low_efficiency_threshold() -> f64 {
    65.0
}

fn default_energy_horizon() -> f64 {
    24.0
}

fn default_energy_price() -> f64 {
    0.12
}

fn default_oee_degraded_composite() -> f64 {
    75.0
}

fn default_stability_trend_delta() -> f64 {
    2.0
}

fn default_metadata_path() -> String {
    "/etc/plant-analytics/metadata.json".to_string()
}

impl EngineConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ENGINE"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| EngineConfig {
            plant_id: default_plant_id(),
            api_port: default_api_port(),
            cycle_interval_secs: default_cycle_interval(),
            window_minutes: default_window_minutes(),
            retention_minutes: default_retention_minutes(),
            min_samples: default_min_samples(),
            anomaly_threshold: default_anomaly_threshold(),
            high_risk_threshold: default_high_risk_threshold(),
            low_stability_threshold: default_low_stability_threshold(),
            low_efficiency_threshold: default_low_efficiency_threshold(),
            energy_horizon_hours: default_energy_horizon(),
            energy_price_usd_per_kwh: default_energy_price(),
            oee_degraded_composite: default_oee_degraded_composite(),
            stability_trend_delta: default_stability_trend_delta(),
            metadata_path: default_metadata_path(),
            model_path: None,
        }))
    }

    /// Load plant metadata from the configured JSON file
    pub fn load_metadata(&self) -> Result<analytics_lib::PlantMetadata> {
        let raw = std::fs::read_to_string(&self.metadata_path)
            .with_context(|| format!("Failed to read metadata file {}", self.metadata_path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid plant metadata in {}", self.metadata_path))
    }
}
