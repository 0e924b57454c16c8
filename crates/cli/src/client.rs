//! API client for communicating with the analytics engine

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the analytics engine
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedStats {
    pub oee: OeeScore,
    pub stability: StabilityIndex,
    pub financial: FinancialImpact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OeeScore {
    pub quality: Option<f64>,
    pub availability: Option<f64>,
    pub performance: Option<f64>,
    #[serde(rename = "score")]
    pub composite: f64,
    pub degraded: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityIndex {
    pub index: f64,
    pub trend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialImpact {
    pub daily_loss_usd: f64,
    pub potential_annual_savings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyRecord {
    pub unit_id: String,
    pub unit_name: String,
    pub avg_energy_consumption: f64,
    pub benchmark: f64,
    pub efficiency_score: f64,
    pub savings_potential: f64,
    pub status: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub feature: String,
    pub contribution_pct: f64,
    pub direction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub unit_id: String,
    #[serde(default)]
    pub tag_id: Option<String>,
    pub severity: String,
    pub condition: String,
    pub message: String,
    pub created_at: i64,
    pub acknowledged: bool,
    #[serde(default)]
    pub acknowledged_at: Option<i64>,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub time_label: String,
    pub production: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeRequest {
    pub acknowledged_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_parses_typed_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/energy")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"unit_id":"CDU-101","unit_name":"Crude Distillation Unit 101",
                    "avg_energy_consumption":120.0,"benchmark":100.0,
                    "efficiency_score":80.0,"savings_potential":480.0,
                    "status":"NEEDS_IMPROVEMENT","recommendation":"clean exchanger train"}]"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let records: Vec<EnergyRecord> = client.get("api/v1/energy").await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].unit_id, "CDU-101");
        assert_eq!(records[0].efficiency_score, 80.0);
    }

    #[tokio::test]
    async fn test_get_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/predictions")
            .with_status(503)
            .with_body("engine warming up")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let result: Result<Vec<Prediction>> = client.get("api/v1/predictions").await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("503"), "error should carry the status: {err}");
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/alerts/7/acknowledge")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "acknowledged_by": "operator-7"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"acknowledged":7}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let body = AcknowledgeRequest {
            acknowledged_by: "operator-7".to_string(),
        };
        let response: serde_json::Value = client
            .post("api/v1/alerts/7/acknowledge", &body)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response["acknowledged"], 7);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
