//! Core library for the plant analytics & predictive-maintenance engine
//!
//! This crate provides:
//! - Telemetry window storage and feature aggregation
//! - OEE, stability, financial and energy-efficiency KPIs
//! - Supervised failure-risk scoring with an independent anomaly signal
//! - Ranked score explanations and templated recommendations
//! - Alert creation/acknowledgment and atomic snapshot publication
//! - The periodic scoring cycle, health checks and observability

pub mod aggregate;
pub mod alerts;
pub mod anomaly;
pub mod cycle;
pub mod energy;
pub mod error;
pub mod explain;
pub mod health;
pub mod kpi;
pub mod models;
pub mod observability;
pub mod publish;
pub mod risk;
pub mod store;

pub use error::AnalyticsError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
