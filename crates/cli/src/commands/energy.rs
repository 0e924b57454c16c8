//! Energy analysis command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, EnergyRecord};
use crate::output::{color_score, format_currency, print_warning, OutputFormat};

/// Row for the energy analysis table
#[derive(Tabled, serde::Serialize)]
struct EnergyRow {
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Consumption")]
    consumption: String,
    #[tabled(rename = "Benchmark")]
    benchmark: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Savings Potential")]
    savings: String,
    #[tabled(rename = "Recommendation")]
    recommendation: String,
}

/// Show per-unit energy efficiency analysis
pub async fn show_energy(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: Vec<EnergyRecord> = client.get("api/v1/energy").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if result.is_empty() {
                print_warning("No energy analysis available yet");
                return Ok(());
            }

            let rows: Vec<EnergyRow> = result
                .iter()
                .map(|r| EnergyRow {
                    unit: format!("{} ({})", r.unit_name, r.unit_id),
                    consumption: format!("{:.1} kWh/bbl", r.avg_energy_consumption),
                    benchmark: format!("{:.1} kWh/bbl", r.benchmark),
                    score: color_score(r.efficiency_score),
                    status: r.status.clone(),
                    savings: format_currency(r.savings_potential, "USD"),
                    recommendation: r.recommendation.clone(),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} units", result.len());
        }
    }

    Ok(())
}
