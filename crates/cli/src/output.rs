//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
#[allow(dead_code)]
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
#[allow(dead_code)]
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format a 0-100 score as a percentage
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Format currency
pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// Format remaining useful life
pub fn format_rul(rul_hours: Option<f64>) -> String {
    match rul_hours {
        Some(hours) if hours < 48.0 => format!("{:.0}h", hours),
        Some(hours) => format!("{:.1}d", hours / 24.0),
        None => "-".to_string(),
    }
}

/// Format a unix timestamp for display
pub fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Color a failure probability by how alarming it is
pub fn color_probability(probability: f64) -> String {
    let formatted = format_percent(probability);
    if probability >= 70.0 {
        formatted.red().bold().to_string()
    } else if probability >= 40.0 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Color an efficiency or stability score
pub fn color_score(score: f64) -> String {
    let formatted = format_percent(score);
    if score >= 85.0 {
        formatted.green().to_string()
    } else if score >= 70.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color an alert severity label
pub fn color_severity(severity: &str) -> String {
    match severity {
        "HIGH" => severity.red().bold().to_string(),
        "MEDIUM" => severity.yellow().to_string(),
        "LOW" => severity.blue().to_string(),
        _ => severity.to_string(),
    }
}

/// Color a stability trend label
pub fn color_trend(trend: &str) -> String {
    match trend {
        "improving" => trend.green().to_string(),
        "declining" => trend.red().to_string(),
        _ => trend.to_string(),
    }
}
