//! Sealed, hash-linked blocks.

use crate::amount::Amount;
use crate::hash::{hash, Hash};
use crate::merkle::{merkle_root, MerkleTree};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// A credit minted out of thin air in the genesis block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub wallet: String,
    pub amount: Amount,
}

impl Allocation {
    pub fn new(wallet: impl Into<String>, amount: Amount) -> Self {
        Self {
            wallet: wallet.into(),
            amount,
        }
    }
}

/// The hashed part of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position in the chain, 0 for genesis.
    pub index: u64,
    /// Hash of the preceding block, `Hash::ZERO` for genesis.
    pub prev_hash: Hash,
    /// Sealing time in microseconds.
    pub timestamp: u64,
    /// Merkle root of the transaction hashes.
    pub merkle_root: Hash,
    /// Commitment to the genesis allocations.
    pub allocations_root: Hash,
    /// Proof-of-work nonce.
    pub nonce: u64,
}

impl BlockHeader {
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(self).expect("serialization should not fail");
        hash(&encoded)
    }
}

/// A block: header, body and the hash it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Initial credits. Only the genesis block may carry any.
    pub allocations: Vec<Allocation>,
    /// Transactions in admission order.
    pub transactions: Vec<Transaction>,
    /// Stored hash of `header`.
    pub hash: Hash,
}

fn allocations_root(allocations: &[Allocation]) -> Hash {
    if allocations.is_empty() {
        return Hash::ZERO;
    }
    let encoded = bincode::serialize(allocations).expect("serialization should not fail");
    hash(&encoded)
}

fn transactions_root(transactions: &[Transaction]) -> Hash {
    let leaves: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
    merkle_root(&leaves)
}

impl Block {
    /// Seal a block, searching for a nonce whose hash starts with
    /// `difficulty` zero hex digits.
    pub fn seal(
        index: u64,
        prev_hash: Hash,
        allocations: Vec<Allocation>,
        transactions: Vec<Transaction>,
        timestamp: u64,
        difficulty: u32,
    ) -> Self {
        let mut header = BlockHeader {
            index,
            prev_hash,
            timestamp,
            merkle_root: transactions_root(&transactions),
            allocations_root: allocations_root(&allocations),
            nonce: 0,
        };

        let hash = loop {
            let candidate = header.hash();
            if candidate.meets_difficulty(difficulty) {
                break candidate;
            }
            header.nonce += 1;
        };

        Self {
            header,
            allocations,
            transactions,
            hash,
        }
    }

    /// Seal the genesis block carrying the initial allocations.
    pub fn genesis(allocations: Vec<Allocation>, timestamp: u64, difficulty: u32) -> Self {
        Self::seal(0, Hash::ZERO, allocations, Vec::new(), timestamp, difficulty)
    }

    /// Recompute the block hash from its fields, with both body
    /// commitments derived from the body rather than trusted from the
    /// header.
    pub fn compute_hash(&self) -> Hash {
        let mut header = self.header.clone();
        header.merkle_root = transactions_root(&self.transactions);
        header.allocations_root = allocations_root(&self.allocations);
        header.hash()
    }

    /// Whether the stored hash and header commitments match the content.
    pub fn verify_hash(&self) -> bool {
        self.header.merkle_root == transactions_root(&self.transactions)
            && self.header.allocations_root == allocations_root(&self.allocations)
            && self.header.hash() == self.hash
    }

    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn prev_hash(&self) -> Hash {
        self.header.prev_hash
    }

    pub fn is_genesis(&self) -> bool {
        self.header.index == 0 && self.header.prev_hash == Hash::ZERO
    }

    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Merkle tree over this block's transactions.
    pub fn merkle_tree(&self) -> MerkleTree {
        let leaves: Vec<Hash> = self.transactions.iter().map(Transaction::hash).collect();
        MerkleTree::new(&leaves)
    }

    /// Position of the transaction with the given id, if present.
    pub fn position_of(&self, tx_id: &Hash) -> Option<usize> {
        self.transactions.iter().position(|tx| tx.id() == *tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::merkle::verify_proof;

    fn coins(n: u64) -> Amount {
        Amount::from_coins(n).unwrap()
    }

    fn signed_tx(keypair: &Keypair, amount: u64, timestamp: u64) -> Transaction {
        let tx = Transaction::new("alice", "bob", coins(amount), timestamp);
        let sig = keypair.sign(&tx.signing_bytes());
        tx.with_signature(sig)
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(vec![Allocation::new("alice", coins(10))], 1, 0);

        assert!(genesis.is_genesis());
        assert_eq!(genesis.index(), 0);
        assert_eq!(genesis.prev_hash(), Hash::ZERO);
        assert!(genesis.transactions.is_empty());
        assert!(genesis.verify_hash());
    }

    #[test]
    fn test_seal_meets_difficulty() {
        let block = Block::seal(1, hash(b"parent"), vec![], vec![], 5, 2);
        assert!(block.hash.meets_difficulty(2));
        assert!(block.hash.to_hex().starts_with("00"));
        assert_eq!(block.compute_hash(), block.hash);
    }

    #[test]
    fn test_tampered_transaction_changes_hash() {
        let keypair = Keypair::generate();
        let block = Block::seal(1, Hash::ZERO, vec![], vec![signed_tx(&keypair, 7, 1)], 2, 0);
        assert!(block.verify_hash());

        let mut tampered = block.clone();
        tampered.transactions[0].receiver.push('x');
        assert!(!tampered.verify_hash());
        assert_ne!(tampered.compute_hash(), block.hash);
    }

    #[test]
    fn test_appended_copy_of_last_transaction_changes_hash() {
        let keypair = Keypair::generate();
        let txs: Vec<_> = (1..=3).map(|i| signed_tx(&keypair, i, i)).collect();
        let block = Block::seal(1, Hash::ZERO, vec![], txs, 10, 0);

        let mut padded = block.clone();
        padded.transactions.push(block.transactions[2].clone());
        assert!(!padded.verify_hash());
        assert_ne!(padded.compute_hash(), block.hash);
    }

    #[test]
    fn test_tampered_allocation_changes_hash() {
        let genesis = Block::genesis(vec![Allocation::new("alice", coins(10))], 1, 0);
        let mut tampered = genesis.clone();
        tampered.allocations[0].amount = coins(1_000);
        assert!(!tampered.verify_hash());
    }

    #[test]
    fn test_tampered_header_root_detected() {
        let keypair = Keypair::generate();
        let mut block =
            Block::seal(1, Hash::ZERO, vec![], vec![signed_tx(&keypair, 7, 1)], 2, 0);
        block.header.merkle_root = Hash::ZERO;
        assert!(!block.verify_hash());
    }

    #[test]
    fn test_empty_block() {
        let block = Block::seal(3, hash(b"parent"), vec![], vec![], 9, 0);
        assert_eq!(block.tx_count(), 0);
        assert_eq!(block.header.merkle_root, Hash::ZERO);
        assert!(block.verify_hash());
    }

    #[test]
    fn test_transaction_inclusion_proof() {
        let keypair = Keypair::generate();
        let txs: Vec<_> = (1..=3).map(|i| signed_tx(&keypair, i, i)).collect();
        let target = txs[1].id();
        let block = Block::seal(1, Hash::ZERO, vec![], txs, 10, 0);

        let position = block.position_of(&target).unwrap();
        assert_eq!(position, 1);
        let proof = block.merkle_tree().proof(position).unwrap();
        assert!(verify_proof(&block.header.merkle_root, &proof));
    }
}
