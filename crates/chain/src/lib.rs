//! Ledger orchestration for dummychain.
//!
//! This crate brings the primitives and a block store together:
//! - **Mempool**: pending transactions in admission order
//! - **Validator**: full replay of a chain from genesis
//! - **Ledger**: wallet creation, submission, mining, validation, balances
//!
//! # Example
//!
//! ```rust,no_run
//! use dummychain_chain::{Ledger, LedgerConfig};
//! use dummychain_core::{Amount, KeyVault};
//! use dummychain_storage::SledStore;
//!
//! let vault = KeyVault::new();
//! vault.generate_wallet("alice", "alice-pw").unwrap();
//! vault.generate_wallet("bob", "bob-pw").unwrap();
//!
//! let config = LedgerConfig::default().with_allocation("alice", Amount::from_coins(10).unwrap());
//! let store = SledStore::open("./ledger_data").unwrap();
//! let ledger = Ledger::open(&vault, store, config).unwrap();
//!
//! ledger
//!     .submit_transaction("alice", "bob", "7".parse().unwrap(), "alice-pw")
//!     .unwrap();
//! let outcome = ledger.mine().unwrap();
//! assert!(outcome.rejected.is_empty());
//! ledger.validate().unwrap();
//! ```

pub mod balances;
pub mod config;
pub mod ledger;
pub mod mempool;
pub mod validator;

// Re-export commonly used types
pub use balances::{BalanceError, Balances};
pub use config::{ConfigError, LedgerConfig, MAX_DIFFICULTY};
pub use ledger::{
    Ledger, LedgerError, LedgerStats, MiningOutcome, RejectedTransaction, Result,
    TransactionProof,
};
pub use mempool::{Mempool, MempoolConfig, MempoolError, MempoolStats};
pub use validator::{validate_chain, ValidationError};
