//! Block persistence for dummychain.
//!
//! The ledger depends only on the [`BlockStore`] capability: append one
//! block, load the whole chain back in order. Two backends are provided:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   Ledger                      │
//! └──────────────────────┬───────────────────────┘
//!                        │ BlockStore
//!          ┌─────────────┴─────────────┐
//!   ┌──────▼──────┐             ┌──────▼──────┐
//!   │ MemoryStore │             │  SledStore  │
//!   │  Vec<Block> │             │ sled + bin- │
//!   │             │             │ code blocks │
//!   └─────────────┘             └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use dummychain_core::Block;
//! use dummychain_storage::{BlockStore, SledStore};
//!
//! let store = SledStore::open("./ledger_data").unwrap();
//! store.append_block(&Block::genesis(vec![], 0, 2)).unwrap();
//! assert_eq!(store.load_chain().unwrap().len(), 1);
//! ```

pub mod chain;
pub mod db;
pub mod memory;

// Re-export commonly used types
pub use chain::SledStore;
pub use db::{Result, Storage, StorageError, TypedBatch};
pub use memory::MemoryStore;

use dummychain_core::Block;
use std::sync::Arc;

/// Append-only block persistence.
///
/// Implementations must reject an append whose index is not exactly the
/// current length, and must return blocks from `load_chain` in index order.
pub trait BlockStore: Send + Sync {
    /// Persist the next block.
    fn append_block(&self, block: &Block) -> Result<()>;

    /// Every stored block, genesis first.
    fn load_chain(&self) -> Result<Vec<Block>>;

    /// Number of stored blocks.
    fn len(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<S: BlockStore + ?Sized> BlockStore for Arc<S> {
    fn append_block(&self, block: &Block) -> Result<()> {
        (**self).append_block(block)
    }

    fn load_chain(&self) -> Result<Vec<Block>> {
        (**self).load_chain()
    }

    fn len(&self) -> Result<u64> {
        (**self).len()
    }
}

impl<S: BlockStore + ?Sized> BlockStore for Box<S> {
    fn append_block(&self, block: &Block) -> Result<()> {
        (**self).append_block(block)
    }

    fn load_chain(&self) -> Result<Vec<Block>> {
        (**self).load_chain()
    }

    fn len(&self) -> Result<u64> {
        (**self).len()
    }
}
