//! Configuration file parsing.
//!
//! A configuration file is optional. Every section has defaults, so an empty
//! file yields the same ledger as no file at all.
//!
//! ```toml
//! [storage]
//! database = "points.db"
//!
//! [amounts]
//! charge = [1000, 5000, 10000]
//! use = [100, 200, 300]
//!
//! [log]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AmountPolicy, Denominations, Points, DEFAULT_DENOMINATIONS, MAX_BALANCE};

/// Top-level ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub amounts: AmountsConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

/// Permitted denominations per operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountsConfig {
    #[serde(default = "default_denominations")]
    pub charge: Vec<Points>,

    #[serde(rename = "use", default = "default_denominations")]
    pub spend: Vec<Points>,
}

impl Default for AmountsConfig {
    fn default() -> Self {
        Self {
            charge: default_denominations(),
            spend: default_denominations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("points.db")
}

fn default_denominations() -> Vec<Points> {
    DEFAULT_DENOMINATIONS.to_vec()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl LedgerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.amounts.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn amount_policy(&self) -> AmountPolicy {
        self.amounts.policy()
    }
}

impl AmountsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, values) in [("charge", &self.charge), ("use", &self.spend)] {
            if values.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "amounts.{} must list at least one denomination",
                    name
                )));
            }
            if let Some(bad) = values.iter().find(|v| **v <= 0 || **v > MAX_BALANCE) {
                return Err(ConfigError::Validation(format!(
                    "amounts.{}: {} is outside 1..={}",
                    name, bad, MAX_BALANCE
                )));
            }
        }
        Ok(())
    }

    pub fn policy(&self) -> AmountPolicy {
        AmountPolicy::new(
            Denominations::new(self.charge.iter().copied()),
            Denominations::new(self.spend.iter().copied()),
        )
    }
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use crate::domain::TransactionKind;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = LedgerConfig::from_toml("").unwrap();
        assert_eq!(config.storage.database, PathBuf::from("points.db"));
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.amount_policy(), AmountPolicy::default());
    }

    #[test]
    fn test_per_operation_amounts() {
        let config = LedgerConfig::from_toml(
            r#"
            [amounts]
            charge = [1000, 5000]
            use = [100, 200, 300]
            "#,
        )
        .unwrap();

        let policy = config.amount_policy();
        assert!(policy.is_allowed(TransactionKind::Charge, 5000));
        assert!(!policy.is_allowed(TransactionKind::Charge, 100));
        assert!(policy.is_allowed(TransactionKind::Use, 100));
        assert!(!policy.is_allowed(TransactionKind::Use, 1000));
    }

    #[test]
    fn test_missing_use_section_falls_back_to_default() {
        let config = LedgerConfig::from_toml("[amounts]\ncharge = [500]\n").unwrap();
        assert_eq!(config.amounts.spend, DEFAULT_DENOMINATIONS.to_vec());
    }

    #[test]
    fn test_rejects_non_positive_denomination() {
        let err = LedgerConfig::from_toml("[amounts]\ncharge = [0, 100]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_rejects_denomination_above_cap() {
        let err = LedgerConfig::from_toml("[amounts]\nuse = [100001]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_rejects_empty_denominations() {
        let err = LedgerConfig::from_toml("[amounts]\ncharge = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_rejects_unknown_section() {
        let err = LedgerConfig::from_toml("[server]\nport = 8080\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = LedgerConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = LedgerConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.amounts.charge, config.amounts.charge);
        assert_eq!(parsed.storage.database, config.storage.database);
    }

    #[test]
    fn test_from_file_missing() {
        let err = LedgerConfig::from_file(Path::new("/nonexistent/pointledger.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
