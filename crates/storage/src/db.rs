//! Typed access to a sled database.
//!
//! Values are bincode-encoded. Writes go through [`TypedBatch`] so that
//! several records land atomically.

use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("out-of-order append: expected block {expected}, got {got}")]
    OutOfOrder { expected: u64, got: u64 },

    #[error("block {0} is missing from the store")]
    MissingBlock(u64),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A set of encoded writes applied all at once by [`Storage::commit`].
#[derive(Default)]
pub struct TypedBatch {
    inner: sled::Batch,
    writes: usize,
}

impl TypedBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `value` under `key`.
    pub fn insert<V: Serialize>(&mut self, key: impl AsRef<[u8]>, value: &V) -> Result<()> {
        self.inner.insert(key.as_ref(), bincode::serialize(value)?);
        self.writes += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes == 0
    }
}

/// Handle on an open sled database.
pub struct Storage {
    db: sled::Db,
}

impl Storage {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// A database that lives only as long as this handle.
    pub fn temporary() -> Result<Self> {
        Ok(Self {
            db: sled::Config::new().temporary(true).open()?,
        })
    }

    /// Decode the value under `key`, if any.
    pub fn read<V: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<Option<V>> {
        self.db
            .get(key)?
            .map(|raw| bincode::deserialize(&raw))
            .transpose()
            .map_err(StorageError::from)
    }

    /// Apply every queued write atomically.
    pub fn commit(&self, batch: TypedBatch) -> Result<()> {
        self.db.apply_batch(batch.inner)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
