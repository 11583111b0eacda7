//! The ledger: wallets, admission, mining, validation and balances.
//!
//! A [`Ledger`] borrows a [`KeyVault`] for keys and owns a [`BlockStore`]
//! for persistence. All operations take `&self` and may be called from
//! several threads at once.
//!
//! Locks are always taken in the order mempool, then chain. The mempool
//! mutex doubles as the mining lock: a `mine` holds it for the whole
//! drain, seal, persist and append sequence, so admissions and other
//! miners wait, while readers only ever touch the chain lock.

use crate::balances::{BalanceError, Balances};
use crate::config::{ConfigError, LedgerConfig};
use crate::mempool::{Mempool, MempoolError, MempoolStats};
use crate::validator::{validate_chain, ValidationError};
use dummychain_core::{
    clock::unix_micros, Amount, Block, Hash, KeyVault, MerkleProof, MonotonicClock, Transaction,
    TransactionError, VaultError, Wallet,
};
use dummychain_storage::{BlockStore, MemoryStore, StorageError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("mempool error: {0}")]
    Mempool(#[from] MempoolError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("unknown wallet: {0}")]
    UnknownWallet(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// A pending transaction that mining refused because its sender could not
/// cover it or its receiver could not hold it. It is in neither the pool
/// nor the chain afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTransaction {
    pub transaction: Transaction,
    pub error: BalanceError,
}

/// Result of one `mine` call.
#[derive(Debug, Clone)]
pub struct MiningOutcome {
    /// The block that was appended.
    pub block: Block,
    /// Transactions left out, in admission order.
    pub rejected: Vec<RejectedTransaction>,
}

/// Where a committed transaction lives, with a proof against its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionProof {
    pub block_index: u64,
    pub block_hash: Hash,
    pub proof: MerkleProof,
}

/// Ledger statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    pub height: u64,
    pub total_transactions: usize,
    pub wallets: usize,
    pub total_supply: Amount,
    pub mempool: MempoolStats,
}

/// In-memory view of the committed chain.
#[derive(Debug)]
struct ChainState {
    blocks: Vec<Block>,
    /// Balances after the last block; only a successful `mine` moves them.
    balances: Balances,
    /// Ids of every committed transaction.
    committed: HashSet<Hash>,
}

impl ChainState {
    /// Caches for a chain that `validate_chain` has accepted.
    fn from_validated(blocks: Vec<Block>, balances: Balances) -> Self {
        let committed = blocks
            .iter()
            .flat_map(|b| b.transactions.iter().map(Transaction::id))
            .collect();
        Self {
            blocks,
            balances,
            committed,
        }
    }

    fn push(&mut self, block: Block, balances: Balances) {
        self.committed
            .extend(block.transactions.iter().map(Transaction::id));
        self.balances = balances;
        self.blocks.push(block);
    }

    fn latest(&self) -> std::result::Result<&Block, ValidationError> {
        self.blocks.last().ok_or(ValidationError::MissingGenesis)
    }
}

/// The ledger engine.
pub struct Ledger<'a, S: BlockStore> {
    vault: &'a KeyVault,
    store: S,
    config: LedgerConfig,
    clock: MonotonicClock,
    chain: RwLock<ChainState>,
    mempool: Mutex<Mempool>,
}

impl<'a> Ledger<'a, MemoryStore> {
    /// Open a fresh ledger backed by memory only.
    pub fn in_memory(vault: &'a KeyVault, config: LedgerConfig) -> Result<Self> {
        Self::open(vault, MemoryStore::new(), config)
    }
}

impl<'a, S: BlockStore> Ledger<'a, S> {
    /// Load the chain from `store`, sealing and persisting a genesis block
    /// with the configured allocations when the store is empty.
    ///
    /// The loaded chain is validated in full; a store holding an
    /// illegitimate chain is refused with [`LedgerError::Validation`].
    pub fn open(vault: &'a KeyVault, store: S, config: LedgerConfig) -> Result<Self> {
        config.validate()?;

        let mut blocks = store.load_chain()?;
        if blocks.is_empty() {
            let genesis = Block::genesis(config.genesis.clone(), unix_micros(), config.difficulty);
            store.append_block(&genesis)?;
            info!(
                hash = %genesis.hash,
                allocations = genesis.allocations.len(),
                "genesis block created"
            );
            blocks.push(genesis);
        }

        let newest = blocks
            .iter()
            .flat_map(|b| {
                std::iter::once(b.header.timestamp)
                    .chain(b.transactions.iter().map(|tx| tx.timestamp))
            })
            .max()
            .unwrap_or(0);

        let balances = validate_chain(&blocks, vault, config.difficulty).map_err(|err| {
            warn!(index = ?err.index(), error = %err, "stored chain is not valid");
            err
        })?;
        let state = ChainState::from_validated(blocks, balances);
        info!(
            height = state.blocks.len() - 1,
            committed = state.committed.len(),
            "ledger opened"
        );

        Ok(Self {
            vault,
            store,
            mempool: Mutex::new(Mempool::with_config(config.mempool.clone())),
            config,
            clock: MonotonicClock::starting_after(newest),
            chain: RwLock::new(state),
        })
    }

    pub fn vault(&self) -> &KeyVault {
        self.vault
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Register a new wallet in the vault.
    pub fn generate_wallet(&self, name: &str, password: &str) -> Result<Wallet> {
        Ok(self.vault.generate_wallet(name, password)?)
    }

    /// Build, sign and admit a transfer from `sender` to `receiver`.
    ///
    /// Both wallets must be registered. Balance is not checked here; an
    /// unaffordable transfer is rejected when the next block is mined.
    pub fn submit_transaction(
        &self,
        sender: &str,
        receiver: &str,
        amount: Amount,
        password: &str,
    ) -> Result<Transaction> {
        let tx = Transaction::new(sender, receiver, amount, self.clock.tick());
        tx.check_well_formed()?;

        let public_key = self.vault.public_key_of(sender)?;
        if !self.vault.contains(receiver) {
            return Err(VaultError::UnknownWallet(receiver.to_string()).into());
        }

        let signature = self.vault.sign(sender, password, &tx.signing_bytes())?;
        let tx = tx.with_signature(signature);
        tx.verify(&public_key)?;

        self.admit(tx.clone())?;
        Ok(tx)
    }

    /// Admit a transaction signed elsewhere. Returns its id.
    pub fn admit_transaction(&self, tx: Transaction) -> Result<Hash> {
        tx.check_well_formed()?;
        let public_key = self.vault.public_key_of(&tx.sender)?;
        tx.verify(&public_key)?;

        let id = tx.id();
        self.admit(tx)?;
        Ok(id)
    }

    fn admit(&self, tx: Transaction) -> Result<()> {
        let mut mempool = self.mempool.lock();
        let chain = self.chain.read();
        let id = tx.id();
        mempool.admit(tx, &chain.committed)?;
        debug!(tx = %id, pending = mempool.len(), "transaction admitted");
        Ok(())
    }

    /// Seal every pending transaction the senders can afford into a new
    /// block and append it.
    ///
    /// Transactions settle in admission order against the chain balances
    /// plus everything accepted earlier in the same pass. An empty pool
    /// still yields an (empty) block.
    pub fn mine(&self) -> Result<MiningOutcome> {
        let mut mempool = self.mempool.lock();

        let (index, prev_hash, mut balances) = {
            let chain = self.chain.read();
            let latest = chain.latest()?;
            (latest.index() + 1, latest.hash, chain.balances.clone())
        };

        let drained = mempool.drain();
        let mut accepted = Vec::with_capacity(drained.len());
        let mut rejected = Vec::new();
        for tx in &drained {
            match balances.apply(tx) {
                Ok(()) => accepted.push(tx.clone()),
                Err(error) => {
                    warn!(tx = %tx.id(), %error, "transaction rejected");
                    rejected.push(RejectedTransaction {
                        transaction: tx.clone(),
                        error,
                    });
                }
            }
        }

        let block = Block::seal(
            index,
            prev_hash,
            Vec::new(),
            accepted,
            self.clock.tick(),
            self.config.difficulty,
        );

        if let Err(err) = self.store.append_block(&block) {
            warn!(index, error = %err, "failed to persist block, restoring pool");
            mempool.restore(drained);
            return Err(err.into());
        }

        self.chain.write().push(block.clone(), balances);
        info!(
            index,
            hash = %block.hash,
            accepted = block.tx_count(),
            rejected = rejected.len(),
            "block sealed"
        );

        Ok(MiningOutcome { block, rejected })
    }

    /// Replay the whole chain from genesis and report the first violation.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let (blocks, cached) = {
            let chain = self.chain.read();
            (chain.blocks.clone(), chain.balances.clone())
        };

        match validate_chain(&blocks, self.vault, self.config.difficulty) {
            Ok(replayed) => {
                if replayed != cached {
                    warn!(height = blocks.len() - 1, "balance cache diverges from replay");
                }
                Ok(())
            }
            Err(err) => {
                warn!(index = ?err.index(), error = %err, "chain validation failed");
                Err(err)
            }
        }
    }

    /// Balance of `name` across all committed blocks.
    pub fn balance_of(&self, name: &str) -> Result<Amount> {
        let chain = self.chain.read();
        if !chain.balances.contains(name) && !self.vault.contains(name) {
            return Err(LedgerError::UnknownWallet(name.to_string()));
        }
        Ok(chain.balances.get(name))
    }

    /// Index of the latest block.
    pub fn height(&self) -> u64 {
        (self.chain.read().blocks.len() as u64).saturating_sub(1)
    }

    pub fn latest_block(&self) -> Result<Block> {
        Ok(self.chain.read().latest()?.clone())
    }

    pub fn block(&self, index: u64) -> Option<Block> {
        self.chain.read().blocks.get(index as usize).cloned()
    }

    /// Snapshot of the committed chain.
    pub fn blocks(&self) -> Vec<Block> {
        self.chain.read().blocks.clone()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.mempool.lock().pending()
    }

    /// Locate a committed transaction by id and prove its inclusion.
    pub fn transaction_proof(&self, tx_id: &Hash) -> Option<TransactionProof> {
        let chain = self.chain.read();
        chain.blocks.iter().find_map(|block| {
            let position = block.position_of(tx_id)?;
            let proof = block.merkle_tree().proof(position)?;
            Some(TransactionProof {
                block_index: block.index(),
                block_hash: block.hash,
                proof,
            })
        })
    }

    pub fn stats(&self) -> LedgerStats {
        let mempool = self.mempool.lock().stats();
        let chain = self.chain.read();
        LedgerStats {
            height: (chain.blocks.len() as u64).saturating_sub(1),
            total_transactions: chain.committed.len(),
            wallets: self.vault.len(),
            total_supply: chain.balances.total_supply(),
            mempool,
        }
    }
}
