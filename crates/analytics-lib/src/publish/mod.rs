//! Snapshot publication
//!
//! All computed results are published as one immutable, versioned
//! snapshot swapped atomically behind a single writer. Readers always see
//! the last fully published snapshot; a failed cycle leaves the prior one
//! visible. Snapshots pushed to the external sink are buffered and
//! retried on failure, never silently dropped.

use crate::error::AnalyticsError;
use crate::models::{
    AdvancedStats, EnergyEfficiencyRecord, FailurePrediction, FinancialImpact, HistoryPoint,
    OeeScope, OeeScore, StabilityIndex, Trend,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// One published view of the whole engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Monotonically increasing publish version
    pub version: u64,
    pub generated_at: i64,
    /// Set when any part of the cycle fell back or was skipped
    pub degraded: bool,
    pub advanced: AdvancedStats,
    pub energy: Vec<EnergyEfficiencyRecord>,
    pub predictions: Vec<FailurePrediction>,
    pub history: Vec<HistoryPoint>,
}

impl EngineSnapshot {
    /// Pre-first-cycle snapshot so readers never block on computation
    pub fn empty() -> Self {
        Self {
            version: 0,
            generated_at: 0,
            degraded: true,
            advanced: AdvancedStats {
                oee: OeeScore {
                    scope: OeeScope::Plant,
                    quality: None,
                    availability: None,
                    performance: None,
                    composite: 0.0,
                    degraded: true,
                    timestamp: 0,
                },
                stability: StabilityIndex {
                    index: 100.0,
                    trend: Trend::Stable,
                },
                financial: FinancialImpact {
                    daily_loss_usd: 0.0,
                    potential_annual_savings: 0.0,
                },
            },
            energy: Vec::new(),
            predictions: Vec::new(),
            history: Vec::new(),
        }
    }
}

/// Single-writer, multi-reader holder of the current snapshot
pub struct SnapshotStore {
    current: RwLock<Arc<EngineSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(EngineSnapshot::empty())),
        }
    }

    /// The last fully published snapshot
    pub fn load(&self) -> Arc<EngineSnapshot> {
        self.current.read().unwrap().clone()
    }

    /// Swap in a new snapshot, assigning the next version
    pub fn publish(&self, mut snapshot: EngineSnapshot) -> Arc<EngineSnapshot> {
        let mut current = self.current.write().unwrap();
        snapshot.version = current.version + 1;
        let arc = Arc::new(snapshot);
        *current = arc.clone();
        arc
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for external snapshot consumers
#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn publish(&self, snapshot: &EngineSnapshot) -> Result<(), AnalyticsError>;
}

/// Default sink: records the publish in the structured log
///
/// The dashboard transport is an external collaborator; in-process
/// consumers read the `SnapshotStore` directly.
pub struct LoggingSink;

#[async_trait]
impl PublishSink for LoggingSink {
    async fn publish(&self, snapshot: &EngineSnapshot) -> Result<(), AnalyticsError> {
        info!(
            version = snapshot.version,
            predictions = snapshot.predictions.len(),
            energy_records = snapshot.energy.len(),
            degraded = snapshot.degraded,
            "Snapshot published"
        );
        Ok(())
    }
}

/// Default cap on buffered snapshots awaiting retry
const DEFAULT_MAX_BUFFERED: usize = 64;

/// Bounded FIFO of snapshots that failed to publish
#[derive(Debug)]
pub struct RetryBuffer {
    queue: VecDeque<Arc<EngineSnapshot>>,
    max_entries: usize,
}

impl RetryBuffer {
    pub fn new(max_entries: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_entries,
        }
    }

    pub fn push(&mut self, snapshot: Arc<EngineSnapshot>) {
        while self.queue.len() >= self.max_entries {
            // Oldest snapshots are superseded anyway; drop from the front.
            self.queue.pop_front();
        }
        self.queue.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn pop(&mut self) -> Option<Arc<EngineSnapshot>> {
        self.queue.pop_front()
    }

    fn push_front(&mut self, snapshot: Arc<EngineSnapshot>) {
        self.queue.push_front(snapshot);
    }
}

/// Publishes snapshots to a sink with buffered retry
pub struct Publisher {
    sink: Arc<dyn PublishSink>,
    buffer: Mutex<RetryBuffer>,
}

impl Publisher {
    pub fn new(sink: Arc<dyn PublishSink>) -> Self {
        Self {
            sink,
            buffer: Mutex::new(RetryBuffer::new(DEFAULT_MAX_BUFFERED)),
        }
    }

    /// Push a snapshot to the sink, draining any backlog first
    ///
    /// On failure the snapshot joins the backlog and the error is
    /// reported; the caller's in-process snapshot swap has already
    /// happened, so readers are unaffected.
    pub async fn publish(&self, snapshot: Arc<EngineSnapshot>) -> Result<(), AnalyticsError> {
        let mut buffer = self.buffer.lock().await;

        while let Some(pending) = buffer.pop() {
            if let Err(e) = self.sink.publish(&pending).await {
                warn!(
                    version = pending.version,
                    buffered = buffer.len() + 1,
                    error = %e,
                    "Sink still unreachable, keeping backlog"
                );
                buffer.push_front(pending);
                buffer.push(snapshot);
                return Err(e);
            }
        }

        if let Err(e) = self.sink.publish(&snapshot).await {
            warn!(version = snapshot.version, error = %e, "Publish failed, buffering snapshot");
            buffer.push(snapshot);
            return Err(e);
        }

        Ok(())
    }

    pub async fn backlog(&self) -> usize {
        self.buffer.lock().await.len()
    }
}
