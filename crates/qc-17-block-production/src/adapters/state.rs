//! Account-map execution state

use crate::ports::ExecutionState;
use primitive_types::U256;
use sha2::{Digest, Sha256};
use shared_types::{Address, Hash};
use std::collections::BTreeMap;

/// Balance and nonce of one account
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Balance in wei
    pub balance: U256,
    /// Next expected nonce
    pub nonce: u64,
}

/// In-memory account state.
///
/// `copy` clones the whole map, so it is O(accounts) here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryState {
    accounts: BTreeMap<Address, Account>,
}

impl MemoryState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// State with a single funded account
    pub fn with_balance(address: Address, balance: U256) -> Self {
        let mut state = Self::new();
        state.set_balance(address, balance);
        state
    }

    /// Account for `address`, if it exists
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Balance of `address`, zero if absent
    pub fn balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|acc| acc.balance)
            .unwrap_or_default()
    }

    /// Nonce of `address`, zero if absent
    pub fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map(|acc| acc.nonce).unwrap_or(0)
    }

    /// Overwrite the balance of `address`
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    /// Add `amount` to `address`
    pub fn credit(&mut self, address: Address, amount: U256) {
        let account = self.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
    }

    /// Subtract `amount` from `address`; false if the balance is short
    pub fn debit(&mut self, address: Address, amount: U256) -> bool {
        let account = self.accounts.entry(address).or_default();
        match account.balance.checked_sub(amount) {
            Some(rest) => {
                account.balance = rest;
                true
            }
            None => false,
        }
    }

    /// Advance the nonce of `address`
    pub fn bump_nonce(&mut self, address: Address) {
        self.accounts.entry(address).or_default().nonce += 1;
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True when no account exists
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl ExecutionState for MemoryState {
    fn copy(&self) -> Self {
        self.clone()
    }

    fn root(&self) -> Hash {
        let mut hasher = Sha256::new();
        for (address, account) in &self.accounts {
            let mut balance = [0u8; 32];
            account.balance.to_big_endian(&mut balance);
            hasher.update(address);
            hasher.update(balance);
            hasher.update(account.nonce.to_le_bytes());
        }
        hasher.finalize().into()
    }
}
