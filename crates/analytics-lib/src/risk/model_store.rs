//! Model artifact loading and atomic swap
//!
//! The scoring model is trained offline and dropped on disk by an external
//! pipeline. This module validates artifacts (size cap, SHA256 checksum),
//! keeps a short version history for rollback, and polls the artifact path
//! during a low-activity window so a new model is picked up and swapped
//! without interrupting scoring.

use super::{OnnxScorer, RiskScorer};
use anyhow::{Context, Result};
use chrono::Timelike;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Configuration for model artifact handling
#[derive(Debug, Clone)]
pub struct ModelStoreConfig {
    /// Directory holding model artifacts
    pub model_dir: PathBuf,
    /// Low-activity hours for swaps (start hour, 0-23)
    pub update_window_start: u8,
    /// Low-activity hours for swaps (end hour, 0-23)
    pub update_window_end: u8,
    /// Poll interval for checking the artifact
    pub poll_interval: Duration,
    /// Maximum artifact size in bytes
    pub max_model_size: usize,
    /// Number of previous versions to keep for rollback
    pub versions_to_keep: usize,
}

impl Default for ModelStoreConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("/var/lib/plant-analytics/models"),
            update_window_start: 2,
            update_window_end: 4,
            poll_interval: Duration::from_secs(3600),
            max_model_size: 10 * 1024 * 1024,
            versions_to_keep: 5,
        }
    }
}

/// One validated model artifact
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub version: String,
    pub path: PathBuf,
    pub checksum: String,
    pub size_bytes: usize,
    pub loaded_at: i64,
}

/// Tracks the current model artifact and its rollback history
pub struct ModelStore {
    config: ModelStoreConfig,
    current: RwLock<Option<ModelArtifact>>,
    previous: RwLock<Vec<ModelArtifact>>,
}

impl ModelStore {
    pub fn new(config: ModelStoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.model_dir)
            .with_context(|| format!("Failed to create model directory {:?}", config.model_dir))?;

        Ok(Self {
            config,
            current: RwLock::new(None),
            previous: RwLock::new(Vec::new()),
        })
    }

    /// Check if we're in the low-activity swap window
    pub fn is_update_window(&self) -> bool {
        let hour = chrono::Local::now().hour() as u8;

        if self.config.update_window_start <= self.config.update_window_end {
            hour >= self.config.update_window_start && hour < self.config.update_window_end
        } else {
            // Window spans midnight
            hour >= self.config.update_window_start || hour < self.config.update_window_end
        }
    }

    /// Read, validate and record an artifact; returns its bytes
    ///
    /// The previous current artifact moves into the rollback history,
    /// trimmed to `versions_to_keep`. Artifact files themselves are owned
    /// by the training pipeline and never deleted here.
    pub async fn load_from_path(
        &self,
        path: &Path,
        expected_checksum: Option<&str>,
    ) -> Result<(ModelArtifact, Vec<u8>)> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read model file {:?}", path))?;

        if bytes.len() > self.config.max_model_size {
            anyhow::bail!(
                "Model size {} exceeds maximum {}",
                bytes.len(),
                self.config.max_model_size
            );
        }

        let checksum = compute_checksum(&bytes);
        if let Some(expected) = expected_checksum {
            if checksum != expected {
                anyhow::bail!("Checksum mismatch: expected {}, got {}", expected, checksum);
            }
        }

        let artifact = ModelArtifact {
            version: format!("sha-{}", &checksum[..12]),
            path: path.to_path_buf(),
            checksum,
            size_bytes: bytes.len(),
            loaded_at: chrono::Utc::now().timestamp(),
        };

        {
            let mut current = self.current.write().await;
            if let Some(old) = current.take() {
                let mut previous = self.previous.write().await;
                previous.insert(0, old);
                previous.truncate(self.config.versions_to_keep);
            }
            *current = Some(artifact.clone());
        }

        info!(
            version = %artifact.version,
            size = artifact.size_bytes,
            path = %artifact.path.display(),
            "Model artifact loaded"
        );

        Ok((artifact, bytes))
    }

    /// Roll back to the most recent previous artifact
    pub async fn rollback(&self) -> Result<Option<ModelArtifact>> {
        let mut previous = self.previous.write().await;

        if previous.is_empty() {
            warn!("No previous model version available for rollback");
            return Ok(None);
        }

        let restored = previous.remove(0);
        if !restored.path.exists() {
            anyhow::bail!("Rollback model file not found: {:?}", restored.path);
        }

        {
            let mut current = self.current.write().await;
            *current = Some(restored.clone());
        }

        info!(version = %restored.version, "Rolled back to previous model version");
        Ok(Some(restored))
    }

    /// Current artifact, if a model is loaded
    pub async fn current(&self) -> Option<ModelArtifact> {
        self.current.read().await.clone()
    }

    /// Versions available for rollback
    pub async fn rollback_versions(&self) -> Vec<String> {
        self.previous
            .read()
            .await
            .iter()
            .map(|v| v.version.clone())
            .collect()
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Background worker polling the artifact path for a new model
///
/// On a checksum change inside the update window the worker builds a new
/// `OnnxScorer` and swaps it into the shared scorer slot; the swap is the
/// only mutation, so in-flight cycles keep the scorer they started with.
pub struct ModelWorker {
    store: Arc<ModelStore>,
    artifact_path: PathBuf,
    feature_names: Vec<String>,
    scorer_slot: Arc<RwLock<Arc<dyn RiskScorer>>>,
}

impl ModelWorker {
    pub fn new(
        store: Arc<ModelStore>,
        artifact_path: PathBuf,
        feature_names: Vec<String>,
        scorer_slot: Arc<RwLock<Arc<dyn RiskScorer>>>,
    ) -> Self {
        Self {
            store,
            artifact_path,
            feature_names,
            scorer_slot,
        }
    }

    /// Load the artifact immediately, ignoring the update window
    ///
    /// Used at startup so the engine does not wait for the first poll.
    pub async fn load_now(&self) -> Result<()> {
        self.reload().await
    }

    pub async fn run(self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        let poll_interval = self.store.config.poll_interval;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {
                    if !self.store.is_update_window() {
                        debug!("Not in update window, skipping model check");
                        continue;
                    }
                    if let Err(e) = self.check_for_update().await {
                        warn!(error = %e, "Model update check failed");
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down model worker");
                    break;
                }
            }
        }
    }

    async fn check_for_update(&self) -> Result<()> {
        if !self.artifact_path.exists() {
            debug!(path = %self.artifact_path.display(), "No model artifact on disk");
            return Ok(());
        }

        let bytes = fs::read(&self.artifact_path)
            .with_context(|| format!("Failed to read {:?}", self.artifact_path))?;
        let checksum = compute_checksum(&bytes);

        let unchanged = self
            .store
            .current()
            .await
            .map(|a| a.checksum == checksum)
            .unwrap_or(false);
        if unchanged {
            debug!("Model artifact unchanged");
            return Ok(());
        }

        self.reload().await
    }

    async fn reload(&self) -> Result<()> {
        let (artifact, bytes) = self
            .store
            .load_from_path(&self.artifact_path, None)
            .await?;

        let scorer = OnnxScorer::new(&bytes, self.feature_names.clone(), artifact.version.clone())
            .context("Failed to build scorer from artifact")?;

        let mut slot = self.scorer_slot.write().await;
        *slot = Arc::new(scorer);

        info!(version = %artifact.version, "Scoring model swapped");
        Ok(())
    }
}
