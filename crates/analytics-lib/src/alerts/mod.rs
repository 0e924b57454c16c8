//! Alert creation and acknowledgment
//!
//! Alerts are an append-only audit trail: created on threshold crossings,
//! mutated only by acknowledgment, never deleted. At most one open alert
//! exists per (entity, condition) pair; repeat crossings while an alert
//! is open are deduplicated.

use crate::models::{Alert, AlertCondition, AlertSeverity};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlertError {
    #[error("alert {0} not found")]
    NotFound(u64),
    #[error("alert {0} already acknowledged")]
    AlreadyAcknowledged(u64),
}

/// Key for open-alert deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OpenKey {
    entity_id: String,
    condition: AlertCondition,
}

/// Alert book: creation, dedup and the OPEN -> ACKNOWLEDGED transition
pub struct AlertBook {
    alerts: RwLock<Vec<Alert>>,
    open: RwLock<HashMap<OpenKey, u64>>,
    next_id: AtomicU64,
}

impl AlertBook {
    pub fn new() -> Self {
        Self {
            alerts: RwLock::new(Vec::new()),
            open: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Raise an alert unless one is already open for (entity, condition)
    ///
    /// Returns the new alert id, or `None` when deduplicated.
    pub fn raise(
        &self,
        entity_id: &str,
        tag_id: Option<&str>,
        condition: AlertCondition,
        severity: AlertSeverity,
        message: impl Into<String>,
        now: i64,
    ) -> Option<u64> {
        let key = OpenKey {
            entity_id: entity_id.to_string(),
            condition,
        };

        let mut open = self.open.write().unwrap();
        if open.contains_key(&key) {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let alert = Alert {
            id,
            unit_id: entity_id.to_string(),
            tag_id: tag_id.map(str::to_string),
            severity,
            condition,
            message: message.into(),
            created_at: now,
            acknowledged: false,
            acknowledged_at: None,
            acknowledged_by: None,
        };

        self.alerts.write().unwrap().push(alert);
        open.insert(key, id);
        Some(id)
    }

    /// Acknowledge an open alert; terminal, records who and when
    pub fn acknowledge(&self, id: u64, by: &str, now: i64) -> Result<(), AlertError> {
        let mut alerts = self.alerts.write().unwrap();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AlertError::NotFound(id))?;

        if alert.acknowledged {
            return Err(AlertError::AlreadyAcknowledged(id));
        }

        alert.acknowledged = true;
        alert.acknowledged_at = Some(now);
        alert.acknowledged_by = Some(by.to_string());

        let key = OpenKey {
            entity_id: alert.unit_id.clone(),
            condition: alert.condition,
        };
        self.open.write().unwrap().remove(&key);
        Ok(())
    }

    /// Whether an open alert exists for (entity, condition)
    pub fn is_open(&self, entity_id: &str, condition: AlertCondition) -> bool {
        self.open.read().unwrap().contains_key(&OpenKey {
            entity_id: entity_id.to_string(),
            condition,
        })
    }

    /// Full alert history, oldest first
    pub fn list(&self) -> Vec<Alert> {
        self.alerts.read().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.open.read().unwrap().len()
    }
}

impl Default for AlertBook {
    fn default() -> Self {
        Self::new()
    }
}
