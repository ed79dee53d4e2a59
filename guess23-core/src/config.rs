use crate::error::{GuessError, Result};
use crate::types::{Address, Wei};
use serde::{Deserialize, Serialize};

/// Process-wide game settings. Fixed at construction; nothing mutates a
/// config once an engine holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub min_players: u32,
    pub max_players: u32,
    pub fee: FeePolicy,
    pub fee_recipient: Address,
}

/// Owner fee as an integer fraction of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub numerator: u128,
    pub denominator: u128,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            numerator: 1,
            denominator: 100, // 1%
        }
    }
}

impl FeePolicy {
    pub fn new(numerator: u128, denominator: u128) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// `floor(pool * numerator / denominator)`, multiply first.
    pub fn fee_for(&self, pool: Wei) -> Option<Wei> {
        pool.checked_mul(self.numerator)?.checked_div(self.denominator)
    }

    pub fn validate(&self) -> Result<()> {
        if self.denominator == 0 {
            return Err(GuessError::config("Fee denominator must be greater than 0"));
        }

        if self.numerator > self.denominator {
            return Err(GuessError::config(format!(
                "Fee {}/{} exceeds the whole pool",
                self.numerator, self.denominator
            )));
        }

        Ok(())
    }
}

impl GameConfig {
    pub fn new(min_players: u32, max_players: u32, fee_recipient: Address) -> Self {
        Self::with_fee(min_players, max_players, FeePolicy::default(), fee_recipient)
    }

    pub fn with_fee(
        min_players: u32,
        max_players: u32,
        fee: FeePolicy,
        fee_recipient: Address,
    ) -> Self {
        Self {
            min_players,
            max_players,
            fee,
            fee_recipient,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_players == 0 {
            return Err(GuessError::config("Minimum players must be at least 1"));
        }

        if self.min_players > self.max_players {
            return Err(GuessError::config(format!(
                "Minimum players ({}) cannot exceed maximum players ({})",
                self.min_players, self.max_players
            )));
        }

        self.fee.validate()
    }

    pub fn owner(&self) -> &Address {
        &self.fee_recipient
    }
}
