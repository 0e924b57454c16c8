//! Alert commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{AcknowledgeRequest, Alert, ApiClient};
use crate::output::{
    color_severity, format_timestamp, print_success, print_warning, OutputFormat,
};

/// Row for the alerts table
#[derive(Tabled, serde::Serialize)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Condition")]
    condition: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Ack")]
    acknowledged: String,
}

/// List alerts, optionally only the open ones
pub async fn list_alerts(
    client: &ApiClient,
    open_only: bool,
    unit: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let result: Vec<Alert> = client.get("api/v1/alerts").await?;

    let filtered: Vec<_> = result
        .into_iter()
        .filter(|a| !open_only || !a.acknowledged)
        .filter(|a| {
            unit.as_ref()
                .map(|u| a.unit_id.contains(u.as_str()))
                .unwrap_or(true)
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&filtered)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if filtered.is_empty() {
                print_warning("No alerts found");
                return Ok(());
            }

            let rows: Vec<AlertRow> = filtered
                .iter()
                .map(|a| AlertRow {
                    id: a.id,
                    entity: a.unit_id.clone(),
                    severity: color_severity(&a.severity),
                    condition: a.condition.clone(),
                    message: a.message.clone(),
                    created: format_timestamp(a.created_at),
                    acknowledged: match (&a.acknowledged_by, a.acknowledged) {
                        (Some(by), _) => format!("by {}", by),
                        (None, false) => "open".to_string(),
                        (None, true) => "yes".to_string(),
                    },
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} alerts", filtered.len());
        }
    }

    Ok(())
}

/// Acknowledge an alert by id
pub async fn acknowledge_alert(client: &ApiClient, id: u64, by: &str) -> Result<()> {
    let request = AcknowledgeRequest {
        acknowledged_by: by.to_string(),
    };

    let _: serde_json::Value = client
        .post(&format!("api/v1/alerts/{}/acknowledge", id), &request)
        .await?;

    print_success(&format!("Alert {} acknowledged by {}", id, by));
    Ok(())
}
