//! Pending transactions awaiting a block.
//!
//! The pool keeps admission order, which is also the settlement order used
//! when mining. It does no balance checks: solvency depends on the whole
//! chain and is decided at mining time.

use dummychain_core::{Hash, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("equivalent transaction {0} is already pending or committed")]
    DuplicateTransaction(Hash),

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Configuration for the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum number of pending transactions.
    pub max_transactions: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
        }
    }
}

/// Transaction mempool.
#[derive(Debug)]
pub struct Mempool {
    config: MempoolConfig,
    /// Pending transactions in admission order.
    pending: Vec<Transaction>,
    /// Ids of everything in `pending`.
    ids: HashSet<Hash>,
}

impl Mempool {
    /// Create a new mempool with default configuration.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether a transaction with this id is pending.
    pub fn contains(&self, tx_id: &Hash) -> bool {
        self.ids.contains(tx_id)
    }

    /// Admit a transaction unless an equivalent one is already pending or
    /// appears in `committed`.
    pub fn admit(&mut self, tx: Transaction, committed: &HashSet<Hash>) -> Result<()> {
        let id = tx.id();
        if self.ids.contains(&id) || committed.contains(&id) {
            return Err(MempoolError::DuplicateTransaction(id));
        }
        if self.pending.len() >= self.config.max_transactions {
            return Err(MempoolError::MempoolFull(self.config.max_transactions));
        }

        self.ids.insert(id);
        self.pending.push(tx);
        Ok(())
    }

    /// Remove and return everything pending, oldest first.
    pub fn drain(&mut self) -> Vec<Transaction> {
        self.ids.clear();
        std::mem::take(&mut self.pending)
    }

    /// Put drained transactions back in front of anything admitted since.
    pub fn restore(&mut self, txs: Vec<Transaction>) {
        self.ids.extend(txs.iter().map(Transaction::id));
        let newer = std::mem::replace(&mut self.pending, txs);
        self.pending.extend(newer);
    }

    /// Snapshot of the pending transactions, oldest first.
    pub fn pending(&self) -> Vec<Transaction> {
        self.pending.clone()
    }

    pub fn stats(&self) -> MempoolStats {
        let senders: HashSet<&str> = self.pending.iter().map(|tx| tx.sender.as_str()).collect();
        MempoolStats {
            total_transactions: self.pending.len(),
            unique_senders: senders.len(),
            capacity: self.config.max_transactions,
        }
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

/// Mempool statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolStats {
    pub total_transactions: usize,
    pub unique_senders: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dummychain_core::Amount;

    fn tx(sender: &str, amount: u64, timestamp: u64) -> Transaction {
        Transaction::new(sender, "bob", Amount::from_coins(amount).unwrap(), timestamp)
    }

    #[test]
    fn test_admit_and_drain_in_order() {
        let mut mempool = Mempool::new();
        let none = HashSet::new();
        let txs: Vec<_> = (1..=3).map(|i| tx("alice", i, i)).collect();
        for t in &txs {
            mempool.admit(t.clone(), &none).unwrap();
        }
        assert_eq!(mempool.len(), 3);
        assert!(mempool.contains(&txs[1].id()));

        assert_eq!(mempool.drain(), txs);
        assert!(mempool.is_empty());
        assert!(!mempool.contains(&txs[1].id()));
    }

    #[test]
    fn test_duplicate_pending_rejected() {
        let mut mempool = Mempool::new();
        let none = HashSet::new();
        let t = tx("alice", 5, 1);
        mempool.admit(t.clone(), &none).unwrap();
        assert_eq!(
            mempool.admit(t.clone(), &none),
            Err(MempoolError::DuplicateTransaction(t.id()))
        );
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_duplicate_committed_rejected() {
        let mut mempool = Mempool::new();
        let t = tx("alice", 5, 1);
        let committed: HashSet<Hash> = [t.id()].into_iter().collect();
        assert!(matches!(
            mempool.admit(t, &committed),
            Err(MempoolError::DuplicateTransaction(_))
        ));
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_capacity_limit() {
        let mut mempool = Mempool::with_config(MempoolConfig {
            max_transactions: 2,
        });
        let none = HashSet::new();
        mempool.admit(tx("alice", 1, 1), &none).unwrap();
        mempool.admit(tx("alice", 1, 2), &none).unwrap();
        assert_eq!(
            mempool.admit(tx("alice", 1, 3), &none),
            Err(MempoolError::MempoolFull(2))
        );
    }

    #[test]
    fn test_restore_puts_drained_first() {
        let mut mempool = Mempool::new();
        let none = HashSet::new();
        let first = tx("alice", 1, 1);
        mempool.admit(first.clone(), &none).unwrap();
        let drained = mempool.drain();

        let later = tx("carol", 2, 2);
        mempool.admit(later.clone(), &none).unwrap();
        mempool.restore(drained);

        assert_eq!(mempool.pending(), vec![first.clone(), later]);
        assert!(mempool.contains(&first.id()));
    }

    #[test]
    fn test_stats() {
        let mut mempool = Mempool::new();
        let none = HashSet::new();
        mempool.admit(tx("alice", 1, 1), &none).unwrap();
        mempool.admit(tx("alice", 2, 2), &none).unwrap();
        mempool.admit(tx("carol", 3, 3), &none).unwrap();

        let stats = mempool.stats();
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.unique_senders, 2);
        assert_eq!(stats.capacity, 10_000);
    }
}
