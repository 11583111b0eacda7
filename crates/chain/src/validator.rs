//! Full-chain validation.
//!
//! [`validate_chain`] replays a block sequence from genesis and reports the
//! first structural or economic violation together with the offending block
//! index. It reads nothing but its arguments.

use crate::balances::{BalanceError, Balances};
use dummychain_core::{Block, Hash, KeyVault, TransactionError};
use std::collections::HashSet;
use thiserror::Error;

/// Why a chain is not legitimate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("chain has no genesis block")]
    MissingGenesis,

    #[error("block {index}: stored hash does not match its content")]
    HashMismatch { index: u64 },

    #[error("block {index}: expected predecessor {expected}, found {found}")]
    ChainBreak {
        index: u64,
        expected: Hash,
        found: Hash,
    },

    #[error("block {index}: hash does not meet difficulty {difficulty}")]
    InsufficientWork { index: u64, difficulty: u32 },

    #[error("block {index}: only the genesis block may carry allocations")]
    UnexpectedAllocation { index: u64 },

    #[error("block {index}: {source}")]
    MalformedTransaction {
        index: u64,
        #[source]
        source: TransactionError,
    },

    #[error("block {index}: transaction {id} was already committed")]
    DuplicateTransaction { index: u64, id: Hash },

    #[error("block {index}: signature by {sender} does not verify")]
    Signature { index: u64, sender: String },

    #[error("block {index}: solvency violated, {source}")]
    SolvencyViolation {
        index: u64,
        #[source]
        source: BalanceError,
    },

    #[error("block {index}: {source}")]
    BalanceOverflow {
        index: u64,
        #[source]
        source: BalanceError,
    },
}

impl ValidationError {
    /// Index of the offending block, if the error concerns one.
    pub fn index(&self) -> Option<u64> {
        match self {
            ValidationError::MissingGenesis => None,
            ValidationError::HashMismatch { index }
            | ValidationError::ChainBreak { index, .. }
            | ValidationError::InsufficientWork { index, .. }
            | ValidationError::UnexpectedAllocation { index }
            | ValidationError::MalformedTransaction { index, .. }
            | ValidationError::DuplicateTransaction { index, .. }
            | ValidationError::Signature { index, .. }
            | ValidationError::SolvencyViolation { index, .. }
            | ValidationError::BalanceOverflow { index, .. } => Some(*index),
        }
    }
}

/// Validate `blocks` from genesis and return the balances they imply.
///
/// Signatures are checked against the public keys currently registered in
/// `vault`; a sender the vault does not know cannot have signed anything.
pub fn validate_chain(
    blocks: &[Block],
    vault: &KeyVault,
    difficulty: u32,
) -> Result<Balances, ValidationError> {
    if blocks.is_empty() {
        return Err(ValidationError::MissingGenesis);
    }

    let mut balances = Balances::new();
    let mut committed = HashSet::new();
    let mut prev_hash = Hash::ZERO;

    for (position, block) in blocks.iter().enumerate() {
        let index = position as u64;

        if !block.verify_hash() {
            return Err(ValidationError::HashMismatch { index });
        }
        if block.prev_hash() != prev_hash || block.index() != index {
            return Err(ValidationError::ChainBreak {
                index,
                expected: prev_hash,
                found: block.prev_hash(),
            });
        }
        if !block.hash.meets_difficulty(difficulty) {
            return Err(ValidationError::InsufficientWork { index, difficulty });
        }
        if index > 0 && !block.allocations.is_empty() {
            return Err(ValidationError::UnexpectedAllocation { index });
        }

        for allocation in &block.allocations {
            balances
                .credit(&allocation.wallet, allocation.amount)
                .map_err(|source| ValidationError::BalanceOverflow { index, source })?;
        }

        for tx in &block.transactions {
            tx.check_well_formed()
                .map_err(|source| ValidationError::MalformedTransaction { index, source })?;

            let id = tx.id();
            if !committed.insert(id) {
                return Err(ValidationError::DuplicateTransaction { index, id });
            }

            let signature_error = || ValidationError::Signature {
                index,
                sender: tx.sender.clone(),
            };
            let public_key = vault
                .public_key_of(&tx.sender)
                .map_err(|_| signature_error())?;
            tx.verify(&public_key).map_err(|_| signature_error())?;

            balances.apply(tx).map_err(|source| match source {
                BalanceError::InsufficientBalance { .. } => {
                    ValidationError::SolvencyViolation { index, source }
                }
                BalanceError::Overflow { .. } => ValidationError::BalanceOverflow { index, source },
            })?;
        }

        prev_hash = block.hash;
    }

    Ok(balances)
}
