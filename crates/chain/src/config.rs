//! Ledger configuration.

use crate::mempool::MempoolConfig;
use dummychain_core::{Allocation, Amount};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("difficulty {difficulty} exceeds the maximum of {max}")]
    DifficultyTooHigh { difficulty: u32, max: u32 },

    #[error("genesis allocations exceed the largest representable supply")]
    GenesisOverflow,
}

/// Highest accepted difficulty, in leading zero hex digits.
pub const MAX_DIFFICULTY: u32 = 16;

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Leading zero hex digits every block hash must have.
    pub difficulty: u32,
    /// Mempool limits.
    pub mempool: MempoolConfig,
    /// Credits sealed into the genesis block of a fresh chain.
    pub genesis: Vec<Allocation>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            mempool: MempoolConfig::default(),
            genesis: Vec::new(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that blocks can be sealed and the genesis supply fits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ConfigError::DifficultyTooHigh {
                difficulty: self.difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        self.genesis
            .iter()
            .try_fold(Amount::ZERO, |total, a| total.checked_add(a.amount))
            .ok_or(ConfigError::GenesisOverflow)?;
        Ok(())
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Add a genesis credit.
    pub fn with_allocation(mut self, wallet: impl Into<String>, amount: Amount) -> Self {
        self.genesis.push(Allocation::new(wallet, amount));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.mempool.max_transactions, 10_000);
        assert!(config.genesis.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LedgerConfig::from_json_str(
            r#"{"genesis": [{"wallet": "alice", "amount": "10.5"}]}"#,
        )
        .unwrap();

        assert_eq!(config.difficulty, 2);
        assert_eq!(
            config.genesis,
            vec![Allocation::new("alice", "10.5".parse().unwrap())]
        );
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"difficulty": 1, "mempool": {{"max_transactions": 5}}}}"#
        )
        .unwrap();

        let config = LedgerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.difficulty, 1);
        assert_eq!(config.mempool.max_transactions, 5);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            LedgerConfig::from_json_str(r#"{"difficulty": "high"}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_difficulty_bound() {
        assert!(matches!(
            LedgerConfig::from_json_str(r#"{"difficulty": 65}"#),
            Err(ConfigError::DifficultyTooHigh {
                difficulty: 65,
                max: MAX_DIFFICULTY
            })
        ));
        let at_bound = format!(r#"{{"difficulty": {MAX_DIFFICULTY}}}"#);
        assert!(LedgerConfig::from_json_str(&at_bound).is_ok());
    }

    #[test]
    fn test_overflowing_genesis() {
        let raw = format!(
            r#"{{"genesis": [{{"wallet": "alice", "amount": {a}}}, {{"wallet": "bob", "amount": {a}}}]}}"#,
            a = serde_json::to_string(&Amount::from_units(u64::MAX / 2 + 1)).unwrap()
        );
        assert!(matches!(
            LedgerConfig::from_json_str(&raw),
            Err(ConfigError::GenesisOverflow)
        ));

        let config = LedgerConfig::default()
            .with_allocation("alice", Amount::from_units(u64::MAX))
            .with_allocation("alice", Amount::from_units(1));
        assert!(matches!(config.validate(), Err(ConfigError::GenesisOverflow)));
    }

    #[test]
    fn test_builder() {
        let config = LedgerConfig::default()
            .with_difficulty(0)
            .with_allocation("alice", Amount::from_coins(3).unwrap());
        assert_eq!(config.difficulty, 0);
        assert_eq!(config.genesis.len(), 1);
    }
}
