//! Password-protected wallet keys.
//!
//! Each wallet's Ed25519 seed is sealed with AES-256-GCM under a key
//! derived from the wallet password with Argon2id. The vault keeps only the
//! public key and the sealed seed; the password itself is never stored, and
//! a decrypted seed lives only for the duration of one `sign` call.

use crate::crypto::{Keypair, PublicKey, Signature};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::{hash_map::Entry, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::info;
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Errors that can occur during vault operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("unknown wallet: {0}")]
    UnknownWallet(String),

    #[error("wallet already exists: {0}")]
    DuplicateWallet(String),

    #[error("invalid credentials for wallet {0}")]
    InvalidCredentials(String),

    #[error("wallet name must not be empty")]
    InvalidName,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("sealed key for wallet {0} is corrupted")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    /// Cheapest parameters Argon2 accepts. Only for tests.
    pub fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn derive(&self, password: &str, salt: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, Some(32))
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        let mut key = Zeroizing::new([0u8; 32]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password.as_bytes(), salt, key.as_mut())
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }
}

/// A wallet seed encrypted under a password-derived key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    kdf: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl SealedKey {
    fn seal(seed: &[u8; 32], password: &str, kdf: KdfParams) -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let key = kdf.derive(password, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), seed.as_slice())
            .map_err(|_| VaultError::KeyDerivation("encryption failed".into()))?;

        Ok(Self {
            kdf,
            salt,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt the seed. An AEAD failure means the password was wrong.
    fn open(&self, wallet: &str, password: &str) -> Result<Zeroizing<[u8; 32]>> {
        let key = self.kdf.derive(password, &self.salt)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
                .map_err(|_| VaultError::InvalidCredentials(wallet.to_string()))?,
        );

        let mut seed = Zeroizing::new([0u8; 32]);
        if plaintext.len() != seed.len() {
            return Err(VaultError::Corrupted(wallet.to_string()));
        }
        seed.copy_from_slice(&plaintext);
        Ok(seed)
    }
}

impl fmt::Debug for SealedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedKey")
            .field("kdf", &self.kdf)
            .finish_non_exhaustive()
    }
}

/// What the vault stores per wallet. Safe to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    pub public_key: PublicKey,
    pub sealed_key: SealedKey,
}

/// Public view of a wallet returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub name: String,
    pub public_key: PublicKey,
}

/// Registry of named wallets.
#[derive(Debug, Default)]
pub struct KeyVault {
    kdf: KdfParams,
    entries: RwLock<HashMap<String, VaultEntry>>,
}

impl KeyVault {
    /// Create an empty vault with default Argon2id costs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty vault with custom Argon2id costs.
    pub fn with_kdf(kdf: KdfParams) -> Self {
        Self {
            kdf,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a wallet named `name` with a fresh random key pair sealed
    /// under `password`.
    pub fn generate_wallet(&self, name: &str, password: &str) -> Result<Wallet> {
        if name.is_empty() {
            return Err(VaultError::InvalidName);
        }
        // Fail fast before paying for key derivation.
        if self.contains(name) {
            return Err(VaultError::DuplicateWallet(name.to_string()));
        }

        let keypair = Keypair::generate();
        let seed = Zeroizing::new(keypair.seed());
        let entry = VaultEntry {
            public_key: keypair.public_key,
            sealed_key: SealedKey::seal(&seed, password, self.kdf)?,
        };
        self.insert(name, entry)?;

        info!(wallet = name, "wallet created");
        Ok(Wallet {
            name: name.to_string(),
            public_key: keypair.public_key,
        })
    }

    /// Sign `message` with the wallet's private key, unlocked by `password`.
    pub fn sign(&self, name: &str, password: &str, message: &[u8]) -> Result<Signature> {
        let entry = self.entry(name)?;
        let seed = entry.sealed_key.open(name, password)?;
        let keypair = Keypair::from_seed(&seed);
        if keypair.public_key != entry.public_key {
            return Err(VaultError::Corrupted(name.to_string()));
        }
        Ok(keypair.sign(message))
    }

    /// Public key registered for `name`.
    pub fn public_key_of(&self, name: &str) -> Result<PublicKey> {
        Ok(self.entry(name)?.public_key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Names of all registered wallets, sorted.
    pub fn wallets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the stored entry, for persistence by the caller.
    pub fn export_entry(&self, name: &str) -> Result<VaultEntry> {
        self.entry(name)
    }

    /// Register a previously exported entry.
    pub fn import_entry(&self, name: &str, entry: VaultEntry) -> Result<()> {
        if name.is_empty() {
            return Err(VaultError::InvalidName);
        }
        self.insert(name, entry)
    }

    fn entry(&self, name: &str) -> Result<VaultEntry> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| VaultError::UnknownWallet(name.to_string()))
    }

    fn insert(&self, name: &str, entry: VaultEntry) -> Result<()> {
        match self.entries.write().entry(name.to_string()) {
            Entry::Occupied(_) => Err(VaultError::DuplicateWallet(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }
}
