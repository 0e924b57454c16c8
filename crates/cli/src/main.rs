//! Plant Analytics CLI
//!
//! A command-line tool for querying plant KPIs, energy analysis,
//! maintenance predictions and alerts from the analytics engine.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{alerts, energy, predictions, stats};

/// Plant Analytics CLI
#[derive(Parser)]
#[command(name = "plantctl")]
#[command(author, version, about = "CLI for the Plant Analytics Engine", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via PLANT_API_URL env var)
    #[arg(long, env = "PLANT_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show advanced plant statistics (OEE, stability, financial)
    Stats,

    /// Show per-unit energy efficiency analysis
    Energy,

    /// Show maintenance predictions
    Predictions {
        /// Filter by equipment id
        #[arg(long, short)]
        equipment: Option<String>,

        /// Show only anomalous equipment
        #[arg(long)]
        anomalies_only: bool,
    },

    /// Show production/efficiency history points
    History,

    /// Alert management
    #[command(subcommand)]
    Alerts(AlertCommands),
}

#[derive(Subcommand)]
pub enum AlertCommands {
    /// List alerts
    List {
        /// Show only open (unacknowledged) alerts
        #[arg(long)]
        open: bool,

        /// Filter by unit or equipment id
        #[arg(long, short)]
        unit: Option<String>,
    },

    /// Acknowledge an alert
    Ack {
        /// Alert id to acknowledge
        id: u64,

        /// Acknowledger name
        #[arg(long, default_value = "cli-user")]
        by: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Stats => {
            stats::show_stats(&client, cli.format).await?;
        }
        Commands::Energy => {
            energy::show_energy(&client, cli.format).await?;
        }
        Commands::Predictions {
            equipment,
            anomalies_only,
        } => {
            predictions::show_predictions(&client, equipment, anomalies_only, cli.format).await?;
        }
        Commands::History => {
            stats::show_history(&client, cli.format).await?;
        }
        Commands::Alerts(alert_cmd) => match alert_cmd {
            AlertCommands::List { open, unit } => {
                alerts::list_alerts(&client, open, unit, cli.format).await?;
            }
            AlertCommands::Ack { id, by } => {
                alerts::acknowledge_alert(&client, id, &by).await?;
            }
        },
    }

    Ok(())
}
