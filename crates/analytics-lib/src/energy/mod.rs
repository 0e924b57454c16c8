//! Energy efficiency scoring
//!
//! Compares each unit's windowed average consumption against its benchmark
//! and produces a 0-100 score, a savings estimate over the configured
//! horizon, and a recommendation picked from a fixed bracket table so the
//! output stays deterministic and testable.

use crate::models::{EfficiencyStatus, EnergyEfficiencyRecord, FeatureValue, UnitMeta};

/// Ordered recommendation rules: first bracket whose floor the score meets
const RECOMMENDATION_RULES: &[(f64, &str)] = &[
    (95.0, "Consumption at benchmark - maintain current operating regime"),
    (
        85.0,
        "Minor drift above benchmark - review furnace and preheat setpoints",
    ),
    (
        70.0,
        "Investigate heat exchanger fouling and clean exchanger train",
    ),
    (
        0.0,
        "Consumption well above benchmark - full energy audit of the unit required",
    ),
];

/// Configuration for the energy scorer
#[derive(Debug, Clone)]
pub struct EnergyConfig {
    /// Horizon, in hours, that the savings estimate is projected over
    pub horizon_hours: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            horizon_hours: 24.0,
        }
    }
}

/// Scores unit energy consumption against benchmarks
pub struct EnergyScorer {
    config: EnergyConfig,
}

impl EnergyScorer {
    pub fn new(config: EnergyConfig) -> Self {
        Self { config }
    }

    /// Score one unit from its windowed average consumption
    ///
    /// Returns `None` when consumption is insufficient this cycle; the
    /// unit is skipped rather than scored from a fabricated value.
    pub fn score_unit(
        &self,
        unit: &UnitMeta,
        avg_consumption: FeatureValue,
    ) -> Option<EnergyEfficiencyRecord> {
        let avg = avg_consumption.value()?;
        let benchmark = unit.energy_benchmark;
        if benchmark <= f64::EPSILON {
            return None;
        }

        let deviation = (avg - benchmark) / benchmark;
        let efficiency_score = (100.0 - deviation * 100.0).clamp(0.0, 100.0);
        let savings_potential = (avg - benchmark).max(0.0) * self.config.horizon_hours;

        Some(EnergyEfficiencyRecord {
            unit_id: unit.unit_id.clone(),
            unit_name: unit.name.clone(),
            avg_energy_consumption: avg,
            benchmark,
            efficiency_score,
            savings_potential,
            status: efficiency_status(efficiency_score),
            recommendation: recommendation_for(efficiency_score).to_string(),
        })
    }
}

impl Default for EnergyScorer {
    fn default() -> Self {
        Self::new(EnergyConfig::default())
    }
}

/// Bracket label for an efficiency score
pub fn efficiency_status(score: f64) -> EfficiencyStatus {
    if score >= 95.0 {
        EfficiencyStatus::Excellent
    } else if score >= 85.0 {
        EfficiencyStatus::Good
    } else if score >= 70.0 {
        EfficiencyStatus::NeedsImprovement
    } else {
        EfficiencyStatus::Poor
    }
}

fn recommendation_for(score: f64) -> &'static str {
    RECOMMENDATION_RULES
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, text)| *text)
        .unwrap_or(RECOMMENDATION_RULES[RECOMMENDATION_RULES.len() - 1].1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdu_101() -> UnitMeta {
        UnitMeta {
            unit_id: "CDU-101".to_string(),
            name: "Crude Distillation Unit 101".to_string(),
            target_throughput: 12_000.0,
            unit_margin: 2.0,
            energy_benchmark: 100.0,
            process_tags: vec![],
            throughput_tag: "throughput".to_string(),
            energy_tag: "power_consumption".to_string(),
            quality_tag: "quality_score".to_string(),
            availability_tag: "availability".to_string(),
        }
    }

    #[test]
    fn test_reference_scenario() {
        let scorer = EnergyScorer::new(EnergyConfig { horizon_hours: 24.0 });
        let record = scorer
            .score_unit(&cdu_101(), FeatureValue::Value(120.0))
            .unwrap();

        assert!((record.efficiency_score - 80.0).abs() < 1e-9);
        assert!((record.savings_potential - 20.0 * 24.0).abs() < 1e-9);
        assert_eq!(record.status, EfficiencyStatus::NeedsImprovement);
    }

    #[test]
    fn test_score_monotonically_non_increasing_in_consumption() {
        let scorer = EnergyScorer::default();
        let unit = cdu_101();

        let mut previous = f64::INFINITY;
        for avg in [100.0, 105.0, 120.0, 150.0, 200.0, 400.0] {
            let score = scorer
                .score_unit(&unit, FeatureValue::Value(avg))
                .unwrap()
                .efficiency_score;
            assert!(
                score <= previous,
                "score {} increased at consumption {}",
                score,
                avg
            );
            previous = score;
        }
    }

    #[test]
    fn test_under_benchmark_clamped_with_no_savings() {
        let scorer = EnergyScorer::default();
        let record = scorer
            .score_unit(&cdu_101(), FeatureValue::Value(80.0))
            .unwrap();

        assert_eq!(record.efficiency_score, 100.0);
        assert_eq!(record.savings_potential, 0.0);
        assert_eq!(record.status, EfficiencyStatus::Excellent);
    }

    #[test]
    fn test_insufficient_consumption_skips_unit() {
        let scorer = EnergyScorer::default();
        assert!(scorer
            .score_unit(&cdu_101(), FeatureValue::Insufficient)
            .is_none());
    }

    #[test]
    fn test_recommendation_brackets() {
        assert!(recommendation_for(96.0).contains("maintain"));
        assert!(recommendation_for(90.0).contains("drift"));
        assert!(recommendation_for(74.0).contains("heat exchanger"));
        assert!(recommendation_for(30.0).contains("energy audit"));
    }
}
