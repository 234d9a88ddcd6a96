//! Shared engine state and its on-disk snapshot

use crate::accumulator::{Accumulator, PersistedAccumulator};
use crate::config::ZerocoinConfig;
use crate::error::Result;
use crate::registry::{MintRegistry, PersistedRegistry};
use crate::types::BlockHeight;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Accumulator and registry state shared by every handle to the engine.
///
/// Starts empty at genesis. Cloning shares the same underlying state.
#[derive(Clone)]
pub struct ZerocoinState {
    accumulator: Arc<RwLock<Accumulator>>,
    registry: Arc<Mutex<MintRegistry>>,
    tip: Arc<RwLock<Option<BlockHeight>>>,
    config: ZerocoinConfig,
}

impl ZerocoinState {
    /// Empty genesis state
    pub fn new(config: ZerocoinConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            accumulator: Arc::new(RwLock::new(Accumulator::new(config.max_checkpoints))),
            registry: Arc::new(Mutex::new(MintRegistry::new())),
            tip: Arc::new(RwLock::new(None)),
            config,
        })
    }

    pub fn accumulator(&self) -> Arc<RwLock<Accumulator>> {
        self.accumulator.clone()
    }

    pub fn registry(&self) -> Arc<Mutex<MintRegistry>> {
        self.registry.clone()
    }

    pub fn config(&self) -> &ZerocoinConfig {
        &self.config
    }

    /// Height of the last ingested block
    pub async fn tip(&self) -> Option<BlockHeight> {
        *self.tip.read().await
    }

    pub(crate) async fn set_tip(&self, height: BlockHeight) {
        *self.tip.write().await = Some(height);
    }

    /// Capture a consistent persisted copy of the current state
    pub async fn to_persisted(&self) -> PersistedState {
        let accumulator = self.accumulator.read().await;
        let registry = self.registry.lock().await;
        PersistedState {
            tip: *self.tip.read().await,
            config: self.config.clone(),
            accumulator: accumulator.to_persisted(),
            registry: registry.to_persisted(),
        }
    }

    /// Rebuild state from its persisted form, recomputing accumulator values
    pub fn from_persisted(persisted: PersistedState) -> Result<Self> {
        persisted.config.validate()?;
        let accumulator = Accumulator::from_persisted(persisted.accumulator)?;
        let registry = MintRegistry::from_persisted(persisted.registry)?;
        Ok(Self {
            accumulator: Arc::new(RwLock::new(accumulator)),
            registry: Arc::new(Mutex::new(registry)),
            tip: Arc::new(RwLock::new(persisted.tip)),
            config: persisted.config,
        })
    }

    /// Write the state as JSON
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let persisted = self.to_persisted().await;
        let json = serde_json::to_string_pretty(&persisted)?;
        tokio::fs::write(path.as_ref(), json).await?;
        tracing::info!("Saved state snapshot to {}", path.as_ref().display());
        Ok(())
    }

    /// Load state written by `save_snapshot`
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let persisted: PersistedState = serde_json::from_str(&raw)?;
        let state = Self::from_persisted(persisted)?;
        tracing::info!("Loaded state snapshot from {}", path.as_ref().display());
        Ok(state)
    }
}

/// On-disk form of `ZerocoinState`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedState {
    pub tip: Option<BlockHeight>,
    pub config: ZerocoinConfig,
    pub accumulator: PersistedAccumulator,
    pub registry: PersistedRegistry,
}
