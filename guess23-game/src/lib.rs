//! Guess 2/3 round engine
//!
//! Participants stake value as an implicit guess. When a round holds
//! `max_players` entries it closes: the target is two thirds of the average
//! stake, the closest stake wins the pool minus the owner fee, and the next
//! round opens in the same call.

pub mod engine;
pub mod error;
pub mod observer;
pub mod payout;
pub mod persist;
pub mod round;

pub use engine::{JoinOutcome, RoundEngine, Settlement};
pub use error::{GameError, Result};
pub use observer::{EventLog, GameHistory, PlayerStats, RoundResult};
pub use payout::Payout;
pub use round::Round;

use guess23_core::{GameConfig, InMemoryLedger};
use std::sync::Arc;

/// Engine paying out into a fresh in-memory ledger.
pub fn create_game(config: GameConfig) -> Result<(RoundEngine, Arc<InMemoryLedger>)> {
    let ledger = Arc::new(InMemoryLedger::new());
    let engine = RoundEngine::new(config, ledger.clone())?;
    Ok((engine, ledger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use guess23_core::{Address, Wei};

    #[test]
    fn test_create_game_pays_into_returned_ledger() {
        let owner = Address::from_bytes([0xee; 20]);
        let (engine, ledger) = create_game(GameConfig::new(1, 2, owner.clone())).unwrap();

        engine
            .join(Address::from_bytes([1; 20]), Wei::from_wei(1_000))
            .unwrap();
        engine
            .join(Address::from_bytes([2; 20]), Wei::from_wei(3_000))
            .unwrap();

        // target = 2 * 2000 / 3 = 1333, closest is the first stake
        assert_eq!(ledger.balance_of(&Address::from_bytes([1; 20])), Wei::from_wei(3_960));
        assert_eq!(ledger.balance_of(&owner), Wei::from_wei(40));
    }
}
