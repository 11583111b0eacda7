//! Signed value transfers between named wallets.

use crate::amount::Amount;
use crate::crypto::{PublicKey, Signature};
use crate::hash::{hash, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when building or checking a transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(&'static str),

    #[error("signature does not verify against {sender}'s public key")]
    Signature { sender: String },
}

/// A transfer of `amount` from `sender` to `receiver`.
///
/// Immutable once signed: any change to the four payload fields
/// invalidates the signature, and any change at all changes `hash()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sending wallet name.
    pub sender: String,
    /// Receiving wallet name.
    pub receiver: String,
    /// Amount moved, always positive.
    pub amount: Amount,
    /// Creation time in microseconds, unique per ledger clock.
    pub timestamp: u64,
    /// Sender's signature over `signing_bytes()`.
    pub signature: Signature,
}

/// The signed payload, in canonical field order.
#[derive(Serialize)]
struct CanonicalPayload<'a> {
    sender: &'a str,
    receiver: &'a str,
    amount: Amount,
    timestamp: u64,
}

impl Transaction {
    /// Create an unsigned transaction.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Amount,
        timestamp: u64,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
            signature: Signature::default(),
        }
    }

    /// Canonical encoding of (sender, receiver, amount, timestamp).
    pub fn signing_bytes(&self) -> Vec<u8> {
        let payload = CanonicalPayload {
            sender: &self.sender,
            receiver: &self.receiver,
            amount: self.amount,
            timestamp: self.timestamp,
        };
        bincode::serialize(&payload).expect("serialization should not fail")
    }

    /// Identity of the transfer, independent of the signature.
    ///
    /// Two transactions with equal ids are equivalent for replay purposes.
    pub fn id(&self) -> Hash {
        hash(&self.signing_bytes())
    }

    /// Hash of the full signed record, used as the merkle leaf.
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(self).expect("serialization should not fail");
        hash(&encoded)
    }

    /// Attach a signature.
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Check the structural rules: positive amount, named parties, no
    /// self-transfer.
    pub fn check_well_formed(&self) -> Result<(), TransactionError> {
        if self.amount.is_zero() {
            return Err(TransactionError::InvalidTransaction(
                "amount must be greater than zero",
            ));
        }
        if self.sender.is_empty() || self.receiver.is_empty() {
            return Err(TransactionError::InvalidTransaction(
                "sender and receiver must be named",
            ));
        }
        if self.sender == self.receiver {
            return Err(TransactionError::InvalidTransaction(
                "sender and receiver must differ",
            ));
        }
        Ok(())
    }

    /// Verify the signature against the sender's public key.
    pub fn verify(&self, public_key: &PublicKey) -> Result<(), TransactionError> {
        public_key
            .verify(&self.signing_bytes(), &self.signature)
            .map_err(|_| TransactionError::Signature {
                sender: self.sender.clone(),
            })
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sends {} dummycoins to {}",
            self.sender, self.amount, self.receiver
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn coins(n: u64) -> Amount {
        Amount::from_coins(n).unwrap()
    }

    fn signed(keypair: &Keypair, amount: Amount, timestamp: u64) -> Transaction {
        let tx = Transaction::new("alice", "bob", amount, timestamp);
        let sig = keypair.sign(&tx.signing_bytes());
        tx.with_signature(sig)
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::generate();
        let tx = signed(&keypair, coins(7), 1);
        assert!(tx.verify(&keypair.public_key).is_ok());
    }

    #[test]
    fn test_wrong_key_verification_fails() {
        let keypair1 = Keypair::generate();
        let keypair2 = Keypair::generate();
        let tx = signed(&keypair1, coins(7), 1);
        assert_eq!(
            tx.verify(&keypair2.public_key),
            Err(TransactionError::Signature {
                sender: "alice".into()
            })
        );
    }

    #[test]
    fn test_tampered_amount_fails_verification() {
        let keypair = Keypair::generate();
        let mut tx = signed(&keypair, coins(7), 1);
        tx.amount = coins(70);
        assert!(tx.verify(&keypair.public_key).is_err());
    }

    #[test]
    fn test_id_ignores_signature_but_hash_does_not() {
        let keypair = Keypair::generate();
        let tx = signed(&keypair, coins(7), 1);
        let unsigned = Transaction::new("alice", "bob", coins(7), 1);

        assert_eq!(tx.id(), unsigned.id());
        assert_ne!(tx.hash(), unsigned.hash());
    }

    #[test]
    fn test_id_distinguishes_timestamp() {
        let a = Transaction::new("alice", "bob", coins(1), 1);
        let b = Transaction::new("alice", "bob", coins(1), 2);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_well_formed_rules() {
        assert!(Transaction::new("alice", "bob", coins(1), 1)
            .check_well_formed()
            .is_ok());
        assert!(matches!(
            Transaction::new("alice", "bob", Amount::ZERO, 1).check_well_formed(),
            Err(TransactionError::InvalidTransaction(_))
        ));
        assert!(matches!(
            Transaction::new("alice", "alice", coins(1), 1).check_well_formed(),
            Err(TransactionError::InvalidTransaction(_))
        ));
        assert!(matches!(
            Transaction::new("", "bob", coins(1), 1).check_well_formed(),
            Err(TransactionError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_display() {
        let tx = Transaction::new("alice", "bob", "2.5".parse().unwrap(), 1);
        assert_eq!(tx.to_string(), "alice sends 2.5 dummycoins to bob");
    }
}
