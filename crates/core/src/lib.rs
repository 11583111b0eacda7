//! Core ledger primitives for dummychain.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - Hashing and Ed25519 signing
//! - Fixed-point amounts
//! - Password-protected wallet keys (`KeyVault`)
//! - Transactions, blocks and their merkle commitments

pub mod amount;
pub mod block;
pub mod clock;
pub mod crypto;
pub mod hash;
pub mod merkle;
pub mod transaction;
pub mod vault;

// Re-export commonly used types at the crate root
pub use amount::{Amount, AmountError};
pub use block::{Allocation, Block, BlockHeader};
pub use clock::MonotonicClock;
pub use crypto::{CryptoError, Keypair, PublicKey, Signature};
pub use hash::{hash, hash_concat, Hash};
pub use merkle::{merkle_root, verify_proof, MerkleProof, MerkleTree};
pub use transaction::{Transaction, TransactionError};
pub use vault::{KdfParams, KeyVault, VaultEntry, VaultError, Wallet};
