//! Vault configuration
//!
//! Deployment parameters and storage settings, read from TOML:
//!
//! ```toml
//! deposit_fee_bps = 100
//! yield_rate_bps = 500
//! withdrawal_delay_seconds = 86400
//!
//! [storage]
//! backend = "sled"
//! path = "./data/vault"
//! tree_name = "vault"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lib_types::{Bps, MAX_BPS};
use serde::{Deserialize, Serialize};

use crate::storage::{MemoryStore, SledStore, StateStore, StorageResult};

/// Configuration validation error
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid parameter {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("Sled backend requires a storage path")]
    MissingStoragePath,

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>,
    pub tree_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: None,
            tree_name: crate::storage::sled_store::DEFAULT_TREE.to_string(),
        }
    }
}

impl StorageConfig {
    /// Open the configured backend
    pub fn open(&self) -> StorageResult<Box<dyn StateStore>> {
        match (self.backend, &self.path) {
            (StorageBackend::Sled, Some(path)) => {
                Ok(Box::new(SledStore::open(path, Some(self.tree_name.as_str()))?))
            }
            (StorageBackend::Sled, None) => Err(anyhow::Error::new(ConfigError::MissingStoragePath).into()),
            (StorageBackend::Memory, _) => Ok(Box::new(MemoryStore::new())),
        }
    }
}

/// Deployment parameters for a vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Fee charged on deposits, applied by `initialize`
    pub deposit_fee_bps: Bps,
    /// Annualized rate, applied by `initialize_v2`
    pub yield_rate_bps: Bps,
    /// Request-to-execute delay, applied by `initialize_v3`
    pub withdrawal_delay_seconds: u64,
    pub storage: StorageConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            deposit_fee_bps: 100,
            yield_rate_bps: 500,
            withdrawal_delay_seconds: 86_400,
            storage: StorageConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: VaultConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deposit_fee_bps > MAX_BPS {
            return Err(ConfigError::InvalidParameter {
                field: "deposit_fee_bps",
                reason: format!("{} exceeds {}", self.deposit_fee_bps, MAX_BPS),
            });
        }
        if self.storage.tree_name.is_empty() {
            return Err(ConfigError::InvalidParameter {
                field: "storage.tree_name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.storage.backend == StorageBackend::Sled && self.storage.path.is_none() {
            return Err(ConfigError::MissingStoragePath);
        }
        if self.yield_rate_bps > MAX_BPS {
            tracing::warn!(
                "Vault config: yield rate {} bps pays more than the principal each year",
                self.yield_rate_bps
            );
        }
        Ok(())
    }
}

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> Result<VaultConfig> {
    tracing::info!("Loading vault configuration from {}", path.display());

    let contents = std::fs::read_to_string(path)
        .map_err(ConfigError::from)
        .with_context(|| format!("reading {}", path.display()))?;
    let config = VaultConfig::from_toml_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;

    tracing::info!(
        "Vault configuration: fee {} bps, yield {} bps, delay {}s, {:?} storage",
        config.deposit_fee_bps,
        config.yield_rate_bps,
        config.withdrawal_delay_seconds,
        config.storage.backend
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_missing_fields() {
        let config = VaultConfig::from_toml_str("deposit_fee_bps = 25").unwrap();
        assert_eq!(config.deposit_fee_bps, 25);
        assert_eq!(config.yield_rate_bps, 500);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.tree_name, "vault");
    }

    #[test]
    fn test_full_document() {
        let config = VaultConfig::from_toml_str(
            r#"
            deposit_fee_bps = 100
            yield_rate_bps = 750
            withdrawal_delay_seconds = 3600

            [storage]
            backend = "sled"
            path = "/tmp/vault-db"
            tree_name = "custody"
            "#,
        )
        .unwrap();
        assert_eq!(config.yield_rate_bps, 750);
        assert_eq!(config.withdrawal_delay_seconds, 3_600);
        assert_eq!(config.storage.backend, StorageBackend::Sled);
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/vault-db")));
        assert_eq!(config.storage.tree_name, "custody");
    }

    #[test]
    fn test_fee_above_max_rejected() {
        let err = VaultConfig::from_toml_str("deposit_fee_bps = 10001").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter { field: "deposit_fee_bps", .. }
        ));
    }

    #[test]
    fn test_sled_without_path_rejected() {
        let err = VaultConfig::from_toml_str("[storage]\nbackend = \"sled\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingStoragePath));
    }

    #[test]
    fn test_malformed_toml() {
        let err = VaultConfig::from_toml_str("deposit_fee_bps = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parsing(_)));
    }

    #[test]
    fn test_memory_backend_opens() {
        let store = StorageConfig::default().open().unwrap();
        store.set(b"k", b"v").unwrap();
        assert!(store.exists(b"k").unwrap());
    }
}
