//! Engine configuration

use crate::error::{Result, ZerocoinError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for mint maturity, checkpointing and spend limits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZerocoinConfig {
    /// Confirmations before a mint may be spent
    pub required_confirmations: u64,
    /// Take an accumulator checkpoint every this many blocks
    pub checkpoint_interval: u64,
    /// Checkpoint heights retained for witness computation
    pub max_checkpoints: usize,
    /// Upper bound on coins spent by one transaction
    pub max_spends_per_tx: usize,
    /// Upper bound on coins created by one mint call
    pub max_mints_per_tx: usize,
}

impl Default for ZerocoinConfig {
    fn default() -> Self {
        Self {
            required_confirmations: 20,
            checkpoint_interval: 10,
            max_checkpoints: 50,
            max_spends_per_tx: 7,
            max_mints_per_tx: 100,
        }
    }
}

impl ZerocoinConfig {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        validate_nonzero("required_confirmations", self.required_confirmations)?;
        validate_nonzero("checkpoint_interval", self.checkpoint_interval)?;
        validate_nonzero("max_checkpoints", self.max_checkpoints as u64)?;
        validate_nonzero("max_spends_per_tx", self.max_spends_per_tx as u64)?;
        validate_nonzero("max_mints_per_tx", self.max_mints_per_tx as u64)?;

        // A mature coin must already sit in some checkpoint
        if self.required_confirmations < self.checkpoint_interval {
            return Err(ZerocoinError::Configuration(format!(
                "required_confirmations ({}) must be at least checkpoint_interval ({})",
                self.required_confirmations, self.checkpoint_interval
            )));
        }
        Ok(())
    }

    /// Defaults overlaid with `ZEROCOIN_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let config = Self {
            required_confirmations: read_u64(
                &lookup,
                "ZEROCOIN_REQUIRED_CONFIRMATIONS",
                default.required_confirmations,
            )?,
            checkpoint_interval: read_u64(
                &lookup,
                "ZEROCOIN_CHECKPOINT_INTERVAL",
                default.checkpoint_interval,
            )?,
            max_checkpoints: read_u64(
                &lookup,
                "ZEROCOIN_MAX_CHECKPOINTS",
                default.max_checkpoints as u64,
            )? as usize,
            max_spends_per_tx: read_u64(
                &lookup,
                "ZEROCOIN_MAX_SPENDS_PER_TX",
                default.max_spends_per_tx as u64,
            )? as usize,
            max_mints_per_tx: read_u64(
                &lookup,
                "ZEROCOIN_MAX_MINTS_PER_TX",
                default.max_mints_per_tx as u64,
            )? as usize,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Whether `height` is a checkpoint height
    pub fn is_checkpoint_height(&self, height: u64) -> bool {
        self.checkpoint_interval != 0 && height % self.checkpoint_interval == 0
    }
}

fn validate_nonzero(label: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(ZerocoinError::Configuration(format!(
            "{} must be greater than zero",
            label
        )));
    }
    Ok(())
}

fn read_u64<F>(lookup: &F, key: &str, fallback: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| {
            ZerocoinError::Configuration(format!("{} is not a number: {}", key, value))
        }),
        None => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ZerocoinConfig::default();
        assert_eq!(config.required_confirmations, 20);
        assert_eq!(config.checkpoint_interval, 10);
        assert_eq!(config.max_checkpoints, 50);
        assert_eq!(config.max_spends_per_tx, 7);
        assert_eq!(config.max_mints_per_tx, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = ZerocoinConfig {
            checkpoint_interval: 0,
            ..ZerocoinConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ZerocoinError::Configuration(_))
        ));
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("ZEROCOIN_REQUIRED_CONFIRMATIONS", "30"),
            ("ZEROCOIN_MAX_SPENDS_PER_TX", " 2 "),
        ]
        .into_iter()
        .collect();
        let config =
            ZerocoinConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.required_confirmations, 30);
        assert_eq!(config.max_spends_per_tx, 2);
        assert_eq!(config.checkpoint_interval, 10);
    }

    #[test]
    fn test_validate_rejects_maturity_before_checkpoint() {
        let config = ZerocoinConfig {
            required_confirmations: 1,
            checkpoint_interval: 10,
            ..ZerocoinConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ZerocoinError::Configuration(_))
        ));

        let config = ZerocoinConfig {
            required_confirmations: 10,
            checkpoint_interval: 10,
            ..ZerocoinConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overlay_rejects_garbage() {
        let result = ZerocoinConfig::from_lookup(|key| {
            (key == "ZEROCOIN_CHECKPOINT_INTERVAL").then(|| "ten".to_string())
        });
        assert!(matches!(result, Err(ZerocoinError::Configuration(_))));
    }

    #[test]
    fn test_partial_json() {
        let config: ZerocoinConfig =
            serde_json::from_str(r#"{"required_confirmations": 1}"#).unwrap();
        assert_eq!(config.required_confirmations, 1);
        assert_eq!(config.max_checkpoints, 50);
        assert!(config.is_checkpoint_height(30));
        assert!(!config.is_checkpoint_height(31));
    }
}
