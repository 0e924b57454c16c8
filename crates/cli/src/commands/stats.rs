//! Advanced statistics and history commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{AdvancedStats, ApiClient, HistoryPoint};
use crate::output::{color_score, color_trend, format_currency, format_timestamp, OutputFormat};

/// Row for the history table
#[derive(Tabled, serde::Serialize)]
struct HistoryRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Production")]
    production: String,
    #[tabled(rename = "Efficiency")]
    efficiency: String,
}

/// Show advanced plant statistics
pub async fn show_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: AdvancedStats = client.get("api/v1/stats/advanced").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", "Overall Equipment Effectiveness".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Composite:              {}{}",
                color_score(result.oee.composite),
                if result.oee.degraded {
                    " (degraded)".yellow().to_string()
                } else {
                    String::new()
                }
            );
            println!("Quality:                {}", component(result.oee.quality));
            println!(
                "Availability:           {}",
                component(result.oee.availability)
            );
            println!(
                "Performance:            {}",
                component(result.oee.performance)
            );
            println!();

            println!("{}", "Process Stability".bold());
            println!("{}", "-".repeat(50));
            println!(
                "Index:                  {}",
                color_score(result.stability.index)
            );
            println!(
                "Trend:                  {}",
                color_trend(&result.stability.trend)
            );
            println!();

            println!("{}", "Financial Impact".bold());
            println!("{}", "-".repeat(50));
            println!(
                "Daily loss:             {}",
                format_currency(result.financial.daily_loss_usd, "USD").red()
            );
            println!(
                "Annual savings at stake: {}",
                format_currency(result.financial.potential_annual_savings, "USD").green()
            );
            println!();
            println!(
                "As of: {}",
                format_timestamp(result.oee.timestamp).dimmed()
            );
        }
    }

    Ok(())
}

/// Show history points for charting
pub async fn show_history(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: Vec<HistoryPoint> = client.get("api/v1/history").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if result.is_empty() {
                crate::output::print_warning("No history yet, the first cycle has not run");
                return Ok(());
            }

            let rows: Vec<HistoryRow> = result
                .iter()
                .map(|p| HistoryRow {
                    time: p.time_label.clone(),
                    production: format!("{:.0}", p.production),
                    efficiency: color_score(p.efficiency),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}

fn component(value: Option<f64>) -> String {
    match value {
        Some(v) => color_score(v),
        None => "insufficient data".dimmed().to_string(),
    }
}
