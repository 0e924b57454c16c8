//! Maintenance prediction command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, Prediction};
use crate::output::{
    color_probability, format_percent, format_rul, print_warning, OutputFormat,
};

/// Row for the predictions table
#[derive(Tabled, serde::Serialize)]
struct PredictionRow {
    #[tabled(rename = "Equipment")]
    equipment: String,
    #[tabled(rename = "Failure Risk")]
    risk: String,
    #[tabled(rename = "RUL")]
    rul: String,
    #[tabled(rename = "Anomaly")]
    anomaly: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Top Driver")]
    top_driver: String,
    #[tabled(rename = "Model")]
    model: String,
}

/// Show maintenance predictions, optionally filtered
pub async fn show_predictions(
    client: &ApiClient,
    equipment: Option<String>,
    anomalies_only: bool,
    format: OutputFormat,
) -> Result<()> {
    let result: Vec<Prediction> = client.get("api/v1/predictions").await?;

    let filtered: Vec<_> = result
        .into_iter()
        .filter(|p| {
            equipment
                .as_ref()
                .map(|e| p.equipment_id.contains(e.as_str()))
                .unwrap_or(true)
        })
        .filter(|p| !anomalies_only || p.is_anomaly)
        .collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&filtered)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if filtered.is_empty() {
                print_warning("No predictions found");
                return Ok(());
            }

            let rows: Vec<PredictionRow> = filtered
                .iter()
                .map(|p| PredictionRow {
                    equipment: format!("{} ({})", p.equipment_name, p.equipment_id),
                    risk: color_probability(p.failure_probability),
                    rul: format_rul(p.rul_hours),
                    anomaly: if p.is_anomaly {
                        "YES".red().bold().to_string()
                    } else {
                        "no".to_string()
                    },
                    confidence: format_percent(p.confidence),
                    top_driver: p
                        .top_drivers
                        .first()
                        .map(|d| {
                            format!(
                                "{} ({} {:.0}%)",
                                d.feature.replace('_', " "),
                                d.direction,
                                d.contribution_pct
                            )
                        })
                        .unwrap_or_else(|| "-".to_string()),
                    model: p.model_source.clone(),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            for p in filtered.iter().filter(|p| p.failure_probability >= 40.0) {
                println!(
                    "\n{} {}",
                    format!("[{}]", p.prediction).red().bold(),
                    p.recommendation
                );
            }
        }
    }

    Ok(())
}
