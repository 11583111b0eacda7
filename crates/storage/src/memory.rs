//! In-memory block store, the default backend.

use crate::db::{Result, StorageError};
use crate::BlockStore;
use dummychain_core::Block;
use parking_lot::RwLock;

/// Keeps blocks in a vector.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: RwLock<Vec<Block>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing block sequence, taken as-is without checks.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: RwLock::new(blocks),
        }
    }
}

impl BlockStore for MemoryStore {
    fn append_block(&self, block: &Block) -> Result<()> {
        let mut blocks = self.blocks.write();
        let expected = blocks.len() as u64;
        if block.index() != expected {
            return Err(StorageError::OutOfOrder {
                expected,
                got: block.index(),
            });
        }
        blocks.push(block.clone());
        Ok(())
    }

    fn load_chain(&self) -> Result<Vec<Block>> {
        Ok(self.blocks.read().clone())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.blocks.read().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_load() {
        let store = MemoryStore::new();
        let genesis = Block::genesis(vec![], 1, 0);
        store.append_block(&genesis).unwrap();

        let block1 = Block::seal(1, genesis.hash, vec![], vec![], 2, 0);
        store.append_block(&block1).unwrap();

        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.load_chain().unwrap(), vec![genesis, block1]);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let store = MemoryStore::new();
        let block = Block::seal(1, Default::default(), vec![], vec![], 2, 0);
        assert!(matches!(
            store.append_block(&block),
            Err(StorageError::OutOfOrder {
                expected: 0,
                got: 1
            })
        ));
    }

    #[test]
    fn test_from_blocks_keeps_content() {
        let mut genesis = Block::genesis(vec![], 1, 0);
        genesis.header.timestamp = 99;
        let store = MemoryStore::from_blocks(vec![genesis.clone()]);
        assert_eq!(store.load_chain().unwrap(), vec![genesis]);
    }
}
