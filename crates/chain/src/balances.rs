//! Running per-wallet balances derived from chain history.

use dummychain_core::{Amount, Transaction};
use std::collections::HashMap;
use thiserror::Error;

/// Why a credit or transfer cannot be settled.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("insufficient balance: {wallet} has {available}, needs {required}")]
    InsufficientBalance {
        wallet: String,
        available: Amount,
        required: Amount,
    },

    #[error("balance overflow: {wallet} holds {balance}, cannot receive {amount}")]
    Overflow {
        wallet: String,
        balance: Amount,
        amount: Amount,
    },
}

/// Balances of every wallet that has appeared in a credit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balances {
    accounts: HashMap<String, Amount>,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `wallet`, zero if it has never been credited.
    pub fn get(&self, wallet: &str) -> Amount {
        self.accounts.get(wallet).copied().unwrap_or(Amount::ZERO)
    }

    /// Whether `wallet` has appeared in any credit or transfer.
    pub fn contains(&self, wallet: &str) -> bool {
        self.accounts.contains_key(wallet)
    }

    /// Add `amount` to `wallet`. Leaves balances untouched on overflow.
    pub fn credit(&mut self, wallet: &str, amount: Amount) -> Result<(), BalanceError> {
        let balance = self.get(wallet);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| BalanceError::Overflow {
                wallet: wallet.to_string(),
                balance,
                amount,
            })?;
        self.accounts.insert(wallet.to_string(), updated);
        Ok(())
    }

    /// Settle one transfer, or leave balances untouched if the sender
    /// cannot cover it or the receiver cannot hold it.
    pub fn apply(&mut self, tx: &Transaction) -> Result<(), BalanceError> {
        let available = self.get(&tx.sender);
        let remaining =
            available
                .checked_sub(tx.amount)
                .ok_or_else(|| BalanceError::InsufficientBalance {
                    wallet: tx.sender.clone(),
                    available,
                    required: tx.amount,
                })?;

        // Credit first so an overflow leaves the sender untouched.
        self.credit(&tx.receiver, tx.amount)?;
        self.accounts.insert(tx.sender.clone(), remaining);
        Ok(())
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Amount {
        self.accounts.values().copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(n: u64) -> Amount {
        Amount::from_coins(n).unwrap()
    }

    #[test]
    fn test_transfer_moves_value() {
        let mut balances = Balances::new();
        balances.credit("alice", coins(10)).unwrap();
        balances
            .apply(&Transaction::new("alice", "bob", coins(7), 1))
            .unwrap();

        assert_eq!(balances.get("alice"), coins(3));
        assert_eq!(balances.get("bob"), coins(7));
        assert_eq!(balances.total_supply(), coins(10));
    }

    #[test]
    fn test_overdraft_leaves_state_untouched() {
        let mut balances = Balances::new();
        balances.credit("alice", coins(3)).unwrap();
        let before = balances.clone();

        let err = balances
            .apply(&Transaction::new("alice", "bob", coins(5), 1))
            .unwrap_err();
        assert_eq!(
            err,
            BalanceError::InsufficientBalance {
                wallet: "alice".into(),
                available: coins(3),
                required: coins(5),
            }
        );
        assert_eq!(balances, before);
        assert!(!balances.contains("bob"));
    }

    #[test]
    fn test_credit_overflow_is_refused() {
        let mut balances = Balances::new();
        let max = Amount::from_units(u64::MAX);
        balances.credit("alice", max).unwrap();

        assert_eq!(
            balances.credit("alice", Amount::from_units(1)),
            Err(BalanceError::Overflow {
                wallet: "alice".into(),
                balance: max,
                amount: Amount::from_units(1),
            })
        );
        assert_eq!(balances.get("alice"), max);
    }

    #[test]
    fn test_transfer_overflow_leaves_state_untouched() {
        let mut balances = Balances::new();
        balances
            .credit("alice", Amount::from_units(u64::MAX / 2 + 1))
            .unwrap();
        balances
            .credit("bob", Amount::from_units(u64::MAX / 2 + 1))
            .unwrap();
        let before = balances.clone();

        let all = balances.get("alice");
        let err = balances
            .apply(&Transaction::new("alice", "bob", all, 1))
            .unwrap_err();
        assert!(matches!(err, BalanceError::Overflow { ref wallet, .. } if wallet == "bob"));
        assert_eq!(balances, before);
    }

    #[test]
    fn test_unknown_wallet_has_zero() {
        let balances = Balances::new();
        assert_eq!(balances.get("ghost"), Amount::ZERO);
        assert!(!balances.contains("ghost"));
    }

    #[test]
    fn test_sequential_transfers_settle_in_order() {
        let mut balances = Balances::new();
        balances.credit("alice", coins(4)).unwrap();

        assert!(balances
            .apply(&Transaction::new("alice", "bob", coins(3), 1))
            .is_ok());
        assert!(balances
            .apply(&Transaction::new("alice", "bob", coins(3), 2))
            .is_err());
        assert_eq!(balances.get("alice"), coins(1));
        assert_eq!(balances.get("bob"), coins(3));
    }
}
