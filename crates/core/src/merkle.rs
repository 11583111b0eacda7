//! Binary merkle commitment over a block's transactions.
//!
//! An odd node at the end of a level is carried up unchanged, so repeating
//! the last leaf changes the root. An empty tree has the zero root.

use crate::hash::{hash_concat, Hash};
use serde::{Deserialize, Serialize};

fn parent_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| match pair.get(1) {
            Some(right) => hash_concat(&[pair[0].as_ref(), right.as_ref()]),
            None => pair[0],
        })
        .collect()
}

/// Compute the merkle root of a list of leaf hashes.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    MerkleTree::new(leaves).root()
}

/// A merkle tree kept level by level, leaves first.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

/// Inclusion proof for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: Hash,
    /// Sibling hashes from the leaf up to the root.
    pub siblings: Vec<Hash>,
    /// For each sibling, whether our running node sits on the left.
    pub directions: Vec<bool>,
}

impl MerkleTree {
    pub fn new(leaves: &[Hash]) -> Self {
        let mut levels = vec![leaves.to_vec()];
        while let Some(top) = levels.last() {
            if top.len() <= 1 {
                break;
            }
            let next = parent_level(top);
            levels.push(next);
        }
        Self { levels }
    }

    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(Hash::ZERO)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Build the proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = *self.levels.first()?.get(index)?;
        let mut siblings = Vec::new();
        let mut directions = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let on_left = idx % 2 == 0;
            let sibling_idx = if on_left { idx + 1 } else { idx - 1 };
            // A carried node has no sibling at this level.
            if let Some(sibling) = level.get(sibling_idx) {
                siblings.push(*sibling);
                directions.push(on_left);
            }
            idx /= 2;
        }

        Some(MerkleProof {
            leaf,
            siblings,
            directions,
        })
    }
}

/// Check a proof against an expected root.
pub fn verify_proof(root: &Hash, proof: &MerkleProof) -> bool {
    if proof.siblings.len() != proof.directions.len() {
        return false;
    }
    let computed = proof
        .siblings
        .iter()
        .zip(&proof.directions)
        .fold(proof.leaf, |node, (sibling, on_left)| {
            if *on_left {
                hash_concat(&[node.as_ref(), sibling.as_ref()])
            } else {
                hash_concat(&[sibling.as_ref(), node.as_ref()])
            }
        });
    computed == *root
}
