//! # Terminal Configuration
//!
//! Loaded once at startup; read-only afterwards.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TALLY_*`)
//! 2. Config file (`config.toml`, or the path in `TALLY_CONFIG`)
//! 3. Defaults (this file)
//!
//! ## Example `config.toml`
//! ```toml
//! tax_rate_bps = 1100
//! cashier = "Ayu"
//! receipt_target = "escpos"
//!
//! [store]
//! name = "TALLY MART"
//! pos_id = "POS-01"
//! address = "Jl. Melati No. 5"
//! ```
//!
//! Device endpoints are not here: they live in the key-value store under
//! `device_config` so the operator can rewrite them at runtime.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tally_core::receipt::{ReceiptTarget, StoreProfile};
use tally_core::validation::validate_tax_rate_bps;
use tally_core::TaxRate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Could not determine app data directory")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Printed in the receipt header and footer.
    pub store: StoreProfile,

    /// Tax rate in basis points; 1100 = 11%.
    pub tax_rate_bps: u32,

    pub cashier: String,

    /// SQLite file. `None` means the platform data directory.
    pub db_path: Option<PathBuf>,

    pub receipt_target: ReceiptTarget,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            store: StoreProfile::default(),
            tax_rate_bps: 1_100,
            cashier: "Cashier".to_string(),
            db_path: None,
            receipt_target: ReceiptTarget::default(),
        }
    }
}

impl TerminalConfig {
    /// Loads from `TALLY_CONFIG` or the default location, then applies
    /// environment overrides. A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var("TALLY_CONFIG") {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => default_config_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => TerminalConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// ## Environment Variables
    /// - `TALLY_DB_PATH`: database file
    /// - `TALLY_CASHIER`: cashier name on receipts
    /// - `TALLY_STORE_NAME`: store name
    /// - `TALLY_TAX_RATE_BPS`: tax rate in basis points
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = var("TALLY_DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(cashier) = var("TALLY_CASHIER") {
            self.cashier = cashier;
        }
        if let Some(name) = var("TALLY_STORE_NAME") {
            self.store.name = name;
        }
        if let Some(bps) = var("TALLY_TAX_RATE_BPS") {
            self.tax_rate_bps = bps.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "TALLY_TAX_RATE_BPS".to_string(),
                reason: format!("'{}' is not a whole number of basis points", bps),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tax_rate_bps(self.tax_rate_bps).map_err(|e| ConfigError::Invalid {
            key: "tax_rate_bps".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Configured database path, or `tally.db` in the platform data
    /// directory (created if missing).
    ///
    /// - **Linux**: `~/.local/share/tally-pos/tally.db`
    /// - **macOS**: `~/Library/Application Support/com.tally.pos/tally.db`
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }
        let dirs = project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Read {
            path: data_dir.to_path_buf(),
            source,
        })?;
        Ok(data_dir.join("tally.db"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tally", "pos")
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = TerminalConfig::from_toml(
            r#"
            tax_rate_bps = 1000
            receipt_target = "layout"

            [store]
            name = "TALLY MART"
            "#,
        )
        .unwrap();

        assert_eq!(config.tax_rate_bps, 1_000);
        assert_eq!(config.receipt_target, ReceiptTarget::Layout);
        assert_eq!(config.store.name, "TALLY MART");
        assert_eq!(config.store.pos_id, StoreProfile::default().pos_id);
        assert_eq!(config.cashier, "Cashier");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_DB_PATH", "/tmp/tally-test.db"),
            ("TALLY_CASHIER", "Ayu"),
            ("TALLY_TAX_RATE_BPS", "1200"),
        ]
        .into_iter()
        .collect();

        let mut config = TerminalConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/tally-test.db")));
        assert_eq!(config.cashier, "Ayu");
        assert_eq!(config.tax_rate().bps(), 1_200);
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/tally-test.db"));
    }

    #[test]
    fn test_bad_env_tax_rate() {
        let mut config = TerminalConfig::default();
        let err = config
            .apply_env(|k| (k == "TALLY_TAX_RATE_BPS").then(|| "11%".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_tax_rate_out_of_range() {
        let config = TerminalConfig {
            tax_rate_bps: 20_000,
            ..TerminalConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "cashier = \"Budi\"\n").unwrap();

        let config = TerminalConfig::from_file(&path).unwrap();
        assert_eq!(config.cashier, "Budi");

        std::fs::write(&path, "cashier = [").unwrap();
        assert!(matches!(
            TerminalConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
