//! HTTP API: readings ingest, read-only snapshot views, alert
//! acknowledgment, health checks and Prometheus metrics
//!
//! Snapshot endpoints only ever return the last fully published snapshot;
//! nothing here triggers synchronous computation.

use analytics_lib::{
    alerts::{AlertBook, AlertError},
    health::{ComponentStatus, HealthRegistry},
    models::Reading,
    observability::EngineMetrics,
    publish::SnapshotStore,
    store::TelemetryStore,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    pub store: Arc<TelemetryStore>,
    pub snapshots: Arc<SnapshotStore>,
    pub alerts: Arc<AlertBook>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: EngineMetrics,
        store: Arc<TelemetryStore>,
        snapshots: Arc<SnapshotStore>,
        alerts: Arc<AlertBook>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            store,
            snapshots,
            alerts,
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub accepted: usize,
}

/// Batch readings ingest from the telemetry feed
async fn ingest_readings(
    State(state): State<Arc<AppState>>,
    Json(readings): Json<Vec<Reading>>,
) -> impl IntoResponse {
    let accepted = readings.len();
    for reading in readings {
        state.store.ingest(reading);
    }
    state.metrics.inc_readings_ingested(accepted as u64);

    (StatusCode::ACCEPTED, Json(IngestResponse { accepted }))
}

/// Advanced stats: OEE, stability and financial impact
async fn advanced_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshots.load();
    Json(snapshot.advanced.clone())
}

/// Per-unit energy analysis, worst units first
async fn energy_analysis(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshots.load();
    Json(snapshot.energy.clone())
}

/// Maintenance predictions, highest risk first
async fn predictions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshots.load();
    Json(snapshot.predictions.clone())
}

/// Chart history points, one per cycle
async fn history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshots.load();
    Json(snapshot.history.clone())
}

/// Full alert history
async fn list_alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.alerts.list())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcknowledgeRequest {
    pub acknowledged_by: String,
}

/// Acknowledge an open alert
async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<AcknowledgeRequest>,
) -> impl IntoResponse {
    let now = chrono::Utc::now().timestamp();

    match state.alerts.acknowledge(id, &request.acknowledged_by, now) {
        Ok(()) => {
            state.metrics.set_open_alerts(state.alerts.open_count() as i64);
            (StatusCode::OK, Json(serde_json::json!({ "acknowledged": id })))
        }
        Err(e @ AlertError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
        Err(e @ AlertError::AlreadyAcknowledged(_)) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/readings", post(ingest_readings))
        .route("/api/v1/stats/advanced", get(advanced_stats))
        .route("/api/v1/energy", get(energy_analysis))
        .route("/api/v1/predictions", get(predictions))
        .route("/api/v1/history", get(history))
        .route("/api/v1/alerts", get(list_alerts))
        .route("/api/v1/alerts/:id/acknowledge", post(acknowledge_alert))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
