//! Ledger configuration.

use finchain_core::{EncryptionSecret, DEFAULT_DIFFICULTY, DEFAULT_MAX_ITERATIONS, MAX_DIFFICULTY};
use thiserror::Error;

pub const ENV_ENCRYPTION_KEY: &str = "FINCHAIN_ENCRYPTION_KEY";
pub const ENV_DIFFICULTY: &str = "FINCHAIN_DIFFICULTY";
pub const ENV_MAX_MINING_ITERATIONS: &str = "FINCHAIN_MAX_MINING_ITERATIONS";
pub const ENV_VERIFY_GENESIS: &str = "FINCHAIN_VERIFY_GENESIS";

/// Errors raised while building or validating a [`LedgerConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("encryption key is missing or empty")]
    MissingKey,

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },

    #[error("difficulty {requested} exceeds maximum {max}")]
    InvalidDifficulty { requested: usize, max: usize },

    #[error("max mining iterations must be greater than zero")]
    ZeroIterations,
}

/// Configuration for the Ledger.
///
/// There is no default encryption key: every deployment supplies its own.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Required count of leading `'0'` characters in block hashes.
    pub difficulty: usize,
    /// Secret the payload encryption key is derived from.
    pub encryption_key: EncryptionSecret,
    /// Nonce attempts before mining gives up.
    pub max_mining_iterations: u64,
    /// Whether verification also recomputes the genesis hash.
    pub verify_genesis: bool,
}

impl LedgerConfig {
    pub fn new(encryption_key: impl Into<String>) -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            encryption_key: EncryptionSecret::new(encryption_key),
            max_mining_iterations: DEFAULT_MAX_ITERATIONS,
            verify_genesis: false,
        }
    }

    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_max_mining_iterations(mut self, max_mining_iterations: u64) -> Self {
        self.max_mining_iterations = max_mining_iterations;
        self
    }

    pub fn with_verify_genesis(mut self, verify_genesis: bool) -> Self {
        self.verify_genesis = verify_genesis;
        self
    }

    /// Check the configuration before a ledger is built from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.encryption_key.is_empty() {
            return Err(ConfigError::MissingKey);
        }
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::InvalidDifficulty {
                requested: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        if self.max_mining_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }

    /// Load configuration from `FINCHAIN_*` environment variables.
    ///
    /// `FINCHAIN_ENCRYPTION_KEY` is required; the other variables fall back
    /// to their defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup(ENV_ENCRYPTION_KEY)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingKey)?;

        let mut config = Self::new(key);
        if let Some(value) = lookup(ENV_DIFFICULTY) {
            config.difficulty = parse_number(ENV_DIFFICULTY, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_MINING_ITERATIONS) {
            config.max_mining_iterations = parse_number(ENV_MAX_MINING_ITERATIONS, &value)?;
        }
        if let Some(value) = lookup(ENV_VERIFY_GENESIS) {
            config.verify_genesis = parse_flag(ENV_VERIFY_GENESIS, &value)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::new("secret");
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.max_mining_iterations, 10_000_000);
        assert!(!config.verify_genesis);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = LedgerConfig::new("hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert_eq!(LedgerConfig::new("").validate(), Err(ConfigError::MissingKey));
        assert_eq!(
            LedgerConfig::new("k").with_difficulty(65).validate(),
            Err(ConfigError::InvalidDifficulty {
                requested: 65,
                max: 64
            })
        );
        assert_eq!(
            LedgerConfig::new("k").with_max_mining_iterations(0).validate(),
            Err(ConfigError::ZeroIterations)
        );
    }

    #[test]
    fn test_from_lookup() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (ENV_ENCRYPTION_KEY, "secret"),
            (ENV_DIFFICULTY, "3"),
            (ENV_MAX_MINING_ITERATIONS, "5000"),
            (ENV_VERIFY_GENESIS, "true"),
        ]))
        .unwrap();

        assert_eq!(config.encryption_key, EncryptionSecret::new("secret"));
        assert_eq!(config.difficulty, 3);
        assert_eq!(config.max_mining_iterations, 5000);
        assert!(config.verify_genesis);
    }

    #[test]
    fn test_from_lookup_requires_key() {
        assert_eq!(
            LedgerConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::MissingKey
        );
        assert_eq!(
            LedgerConfig::from_lookup(lookup(&[(ENV_ENCRYPTION_KEY, "")])).unwrap_err(),
            ConfigError::MissingKey
        );
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = LedgerConfig::from_lookup(lookup(&[
            (ENV_ENCRYPTION_KEY, "secret"),
            (ENV_DIFFICULTY, "two"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: ENV_DIFFICULTY.to_string(),
                value: "two".to_string()
            }
        );

        let err = LedgerConfig::from_lookup(lookup(&[
            (ENV_ENCRYPTION_KEY, "secret"),
            (ENV_VERIFY_GENESIS, "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
