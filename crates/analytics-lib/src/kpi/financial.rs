//! Financial impact of off-target operation

use crate::models::FinancialImpact;

/// Configuration for financial loss estimation
#[derive(Debug, Clone)]
pub struct FinancialConfig {
    /// Industrial energy price used to cost wasted consumption
    pub energy_price_usd_per_kwh: f64,
}

impl Default for FinancialConfig {
    fn default() -> Self {
        Self {
            energy_price_usd_per_kwh: 0.12,
        }
    }
}

/// Loss from missing the throughput target, floored at zero
///
/// Over-target production is never reported as a negative loss.
pub fn throughput_loss(target_throughput: f64, actual_throughput: f64, unit_margin: f64) -> f64 {
    ((target_throughput - actual_throughput) * unit_margin).max(0.0)
}

/// Combine per-unit throughput losses with the cost of wasted energy
pub fn daily_loss(
    unit_losses: impl IntoIterator<Item = f64>,
    waste_kwh: f64,
    config: &FinancialConfig,
) -> FinancialImpact {
    let throughput: f64 = unit_losses.into_iter().sum();
    let energy = waste_kwh.max(0.0) * config.energy_price_usd_per_kwh;
    let daily_loss_usd = throughput + energy;

    FinancialImpact {
        daily_loss_usd,
        potential_annual_savings: daily_loss_usd * 365.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_floored_at_zero() {
        assert_eq!(throughput_loss(12_000.0, 11_000.0, 2.0), 2_000.0);
        // Over-production must not become negative loss.
        assert_eq!(throughput_loss(12_000.0, 13_000.0, 2.0), 0.0);
    }

    #[test]
    fn test_daily_loss_combines_throughput_and_energy() {
        let config = FinancialConfig {
            energy_price_usd_per_kwh: 0.12,
        };
        let impact = daily_loss([100.0, 250.0], 500.0, &config);

        assert!((impact.daily_loss_usd - (350.0 + 60.0)).abs() < 1e-9);
        assert!((impact.potential_annual_savings - impact.daily_loss_usd * 365.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_waste_ignored() {
        let impact = daily_loss([], -50.0, &FinancialConfig::default());
        assert_eq!(impact.daily_loss_usd, 0.0);
    }
}
