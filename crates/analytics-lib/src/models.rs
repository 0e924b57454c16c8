//! Core data models for the plant analytics engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quality flag attached to a raw process reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Bad,
}

/// Raw process reading from the plant telemetry feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub unit_id: String,
    pub tag_id: String,
    pub timestamp: i64,
    pub value: f64,
    pub quality: Quality,
}

/// Key for a per-(unit, tag) time series
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagKey {
    pub unit_id: String,
    pub tag_id: String,
}

impl TagKey {
    pub fn new(unit_id: impl Into<String>, tag_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            tag_id: tag_id.into(),
        }
    }
}

/// One aggregated feature slot
///
/// A slot with fewer than the minimum sample count is `Insufficient`,
/// never a defaulted zero. Consumers must treat it as missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FeatureValue {
    Value(f64),
    Insufficient,
}

impl FeatureValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            FeatureValue::Value(v) => Some(*v),
            FeatureValue::Insufficient => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, FeatureValue::Insufficient)
    }
}

/// Windowed feature set for a unit or a piece of equipment
///
/// Features are keyed by `{tag}_{stat}` and kept in a BTreeMap so that
/// iteration order is deterministic across recomputations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub entity_id: String,
    pub window_start: i64,
    pub window_end: i64,
    pub features: BTreeMap<String, FeatureValue>,
}

impl FeatureVector {
    /// Number of slots carrying a usable value
    pub fn present_count(&self) -> usize {
        self.features.values().filter(|f| f.value().is_some()).count()
    }

    /// True when no slot carries a usable value
    pub fn is_unusable(&self) -> bool {
        self.present_count() == 0
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.features.get(feature).and_then(|f| f.value())
    }
}

/// Scope of an OEE computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OeeScope {
    Plant,
    Unit(String),
}

/// Overall Equipment Effectiveness snapshot
///
/// `composite` is always recomputed from the current components, never
/// persisted and patched. Components unavailable this cycle are `None`
/// and force the configured degraded fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OeeScore {
    pub scope: OeeScope,
    pub quality: Option<f64>,
    pub availability: Option<f64>,
    pub performance: Option<f64>,
    /// Exposed as `score` on the wire
    #[serde(rename = "score")]
    pub composite: f64,
    pub degraded: bool,
    pub timestamp: i64,
}

/// Direction of the stability index relative to the previous cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// Process stability derived from variance of key variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityIndex {
    pub index: f64,
    pub trend: Trend,
}

/// Financial impact of current operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialImpact {
    pub daily_loss_usd: f64,
    pub potential_annual_savings: f64,
}

/// Composite operational KPIs exposed to the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedStats {
    pub oee: OeeScore,
    pub stability: StabilityIndex,
    pub financial: FinancialImpact,
}

/// Efficiency bracket label for a unit's energy analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EfficiencyStatus {
    Excellent,
    Good,
    NeedsImprovement,
    Poor,
}

/// Per-unit energy efficiency analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyEfficiencyRecord {
    pub unit_id: String,
    pub unit_name: String,
    pub avg_energy_consumption: f64,
    pub benchmark: f64,
    pub efficiency_score: f64,
    pub savings_potential: f64,
    pub status: EfficiencyStatus,
    pub recommendation: String,
}

/// Direction of a driver's recent movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

/// One ranked contributor to a failure-risk score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub feature: String,
    pub contribution_pct: f64,
    pub direction: Direction,
}

/// Failure-risk prediction for a piece of equipment
///
/// Fully replaced every scoring cycle; never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePrediction {
    pub equipment_id: String,
    pub equipment_name: String,
    pub failure_probability: f64,
    pub rul_hours: Option<f64>,
    pub is_anomaly: bool,
    pub confidence: f64,
    pub top_drivers: Vec<Driver>,
    pub recommendation: String,
    pub prediction: String,
    pub generated_at: i64,
    pub model_source: String,
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Low => write!(f, "LOW"),
            AlertSeverity::Medium => write!(f, "MEDIUM"),
            AlertSeverity::High => write!(f, "HIGH"),
        }
    }
}

/// Condition that raised an alert, used as the deduplication key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    LowStability,
    LowEfficiency,
    HighFailureRisk,
    Anomaly,
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertCondition::LowStability => write!(f, "low_stability"),
            AlertCondition::LowEfficiency => write!(f, "low_efficiency"),
            AlertCondition::HighFailureRisk => write!(f, "high_failure_risk"),
            AlertCondition::Anomaly => write!(f, "anomaly"),
        }
    }
}

/// Alert record, append-only audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub unit_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<String>,
    pub severity: AlertSeverity,
    pub condition: AlertCondition,
    pub message: String,
    pub created_at: i64,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
}

/// One chart point per aggregation cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub time_label: String,
    pub production: f64,
    pub efficiency: f64,
}

/// Process unit metadata supplied by the plant master data collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitMeta {
    pub unit_id: String,
    pub name: String,
    /// Target throughput used for the OEE performance ratio and loss estimate
    pub target_throughput: f64,
    /// Margin per throughput unit, in USD
    pub unit_margin: f64,
    /// Benchmark energy consumption (e.g. kWh per barrel)
    pub energy_benchmark: f64,
    /// Tags whose variance drives the stability index
    pub process_tags: Vec<String>,
    pub throughput_tag: String,
    pub energy_tag: String,
    pub quality_tag: String,
    pub availability_tag: String,
}

/// Equipment metadata with its sensor-to-tag mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentMeta {
    pub equipment_id: String,
    pub name: String,
    pub equipment_type: String,
    pub unit_id: String,
    pub sensor_tags: Vec<String>,
    /// Failure thresholds keyed by sensor tag, applied to the tag's
    /// windowed mean for RUL extrapolation. Tags without one never yield
    /// a RUL estimate.
    #[serde(default)]
    pub failure_thresholds: BTreeMap<String, f64>,
}

/// Plant master data consumed at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlantMetadata {
    pub units: Vec<UnitMeta>,
    pub equipment: Vec<EquipmentMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_value_accessors() {
        assert_eq!(FeatureValue::Value(1.5).value(), Some(1.5));
        assert_eq!(FeatureValue::Insufficient.value(), None);
        assert!(FeatureValue::Insufficient.is_insufficient());
    }

    #[test]
    fn test_feature_vector_present_count() {
        let mut features = BTreeMap::new();
        features.insert("temp_mean".to_string(), FeatureValue::Value(75.0));
        features.insert("temp_roc".to_string(), FeatureValue::Insufficient);

        let vector = FeatureVector {
            entity_id: "PUMP-CDU-101".to_string(),
            window_start: 0,
            window_end: 3600,
            features,
        };

        assert_eq!(vector.present_count(), 1);
        assert!(!vector.is_unusable());
        assert_eq!(vector.get("temp_mean"), Some(75.0));
        assert_eq!(vector.get("temp_roc"), None);
    }

    #[test]
    fn test_alert_condition_display() {
        assert_eq!(AlertCondition::HighFailureRisk.to_string(), "high_failure_risk");
        assert_eq!(AlertSeverity::High.to_string(), "HIGH");
    }

    #[test]
    fn test_reading_round_trips_through_json() {
        let reading = Reading {
            unit_id: "CDU-101".to_string(),
            tag_id: "temperature".to_string(),
            timestamp: 1700000000,
            value: 348.5,
            quality: Quality::Good,
        };

        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"quality\":\"good\""));
        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(back.unit_id, "CDU-101");
        assert_eq!(back.value, 348.5);
    }
}
