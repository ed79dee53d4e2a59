use crate::error::{GuessError, Result};
use crate::types::{Address, Wei};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Outbound value transfer. Calls are synchronous and complete or fail as a
/// whole; a failed transfer leaves no balance change behind.
pub trait Ledger: Send + Sync {
    fn transfer(&self, to: &Address, amount: Wei) -> Result<()>;
}

/// Balance book kept in memory. Addresses marked with [`reject`] refuse
/// incoming funds, like a contract account with no payable fallback.
///
/// [`reject`]: InMemoryLedger::reject
#[derive(Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<Address, Wei>>,
    rejecting: RwLock<HashSet<Address>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, address: Address) {
        self.rejecting.write().insert(address);
    }

    pub fn accept(&self, address: &Address) {
        self.rejecting.write().remove(address);
    }

    pub fn balance_of(&self, address: &Address) -> Wei {
        self.balances
            .read()
            .get(address)
            .copied()
            .unwrap_or(Wei::ZERO)
    }

    /// All credited balances, sorted by address.
    pub fn balances(&self) -> Vec<(Address, Wei)> {
        let mut balances: Vec<_> = self
            .balances
            .read()
            .iter()
            .map(|(address, amount)| (address.clone(), *amount))
            .collect();
        balances.sort();
        balances
    }

    pub fn total_credited(&self) -> Option<Wei> {
        Wei::checked_sum(self.balances.read().values().copied())
    }
}

impl Ledger for InMemoryLedger {
    fn transfer(&self, to: &Address, amount: Wei) -> Result<()> {
        if self.rejecting.read().contains(to) {
            return Err(GuessError::transfer_rejected(
                to,
                amount.to_wei(),
                "recipient does not accept funds",
            ));
        }

        let mut balances = self.balances.write();
        let balance = balances.entry(to.clone()).or_insert(Wei::ZERO);
        *balance = balance.checked_add(amount).ok_or_else(|| {
            GuessError::transfer_rejected(to, amount.to_wei(), "recipient balance overflow")
        })?;

        tracing::debug!("Credited {} wei to {}", amount, to);
        Ok(())
    }
}
