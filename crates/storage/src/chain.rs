//! sled-backed block store.

use crate::db::{Result, Storage, StorageError, TypedBatch};
use crate::BlockStore;
use dummychain_core::Block;
use parking_lot::Mutex;
use std::path::Path;

/// Number of blocks stored.
const CHAIN_LEN_KEY: &[u8] = b"chain:height";

fn block_key(index: u64) -> Vec<u8> {
    format!("block:height:{index}").into_bytes()
}

/// Persists blocks in a sled database.
///
/// Layout:
/// - `block:height:{n}` → bincode of block `n`
/// - `chain:height`     → number of stored blocks
pub struct SledStore {
    storage: Storage,
    append_lock: Mutex<()>,
}

impl SledStore {
    /// Open (or create) a store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Storage::open(path)?))
    }

    /// Open a store that disappears when dropped.
    pub fn open_temporary() -> Result<Self> {
        Ok(Self::new(Storage::temporary()?))
    }

    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            append_lock: Mutex::new(()),
        }
    }

    /// Fetch a single block by index.
    pub fn get_block(&self, index: u64) -> Result<Option<Block>> {
        self.storage.read(block_key(index))
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.storage.flush()
    }
}

impl BlockStore for SledStore {
    /// The block and the new length are written in one batch, so a crash
    /// never leaves a length pointing past the last block.
    fn append_block(&self, block: &Block) -> Result<()> {
        let _guard = self.append_lock.lock();
        let expected = self.len()?;
        if block.index() != expected {
            return Err(StorageError::OutOfOrder {
                expected,
                got: block.index(),
            });
        }

        let mut batch = TypedBatch::new();
        batch.insert(block_key(expected), block)?;
        batch.insert(CHAIN_LEN_KEY, &(expected + 1))?;
        self.storage.commit(batch)
    }

    fn load_chain(&self) -> Result<Vec<Block>> {
        let len = self.len()?;
        (0..len)
            .map(|index| {
                self.get_block(index)?
                    .ok_or(StorageError::MissingBlock(index))
            })
            .collect()
    }

    fn len(&self) -> Result<u64> {
        Ok(self.storage.read::<u64>(CHAIN_LEN_KEY)?.unwrap_or(0))
    }
}
