//! Bridges the in-memory engine and SQLite storage.

use crate::engine::{RoundEngine, Settlement};
use crate::{GameError, Result};
use guess23_core::{Checkpoint, EventStore, GameConfig, Ledger, RoundStore, Storage};
use std::sync::Arc;

/// Stores a fresh game with `config` and an empty round 0. An existing game
/// is only replaced when `force` is set.
pub async fn initialize(storage: &Storage, config: &GameConfig, force: bool) -> Result<()> {
    config.validate()?;

    let rounds = RoundStore::new(storage);
    if !force && rounds.load_config().await?.is_some() {
        return Err(GameError::AlreadyInitialized);
    }

    rounds.initialize(config).await?;
    Ok(())
}

pub async fn is_initialized(storage: &Storage) -> Result<bool> {
    Ok(RoundStore::new(storage).load_config().await?.is_some())
}

/// Rebuilds the engine from stored config, round and event log.
pub async fn load_engine(storage: &Storage, ledger: Arc<dyn Ledger>) -> Result<RoundEngine> {
    let rounds = RoundStore::new(storage);
    let config = rounds
        .load_config()
        .await?
        .ok_or(GameError::NotInitialized)?;
    let snapshot = rounds
        .load_round()
        .await?
        .ok_or_else(|| GameError::corrupt("game config stored without a round"))?;
    let events = EventStore::new(storage).load_events().await?;

    RoundEngine::restore(config, ledger, snapshot, events)
}

/// Commits the engine's current round, every event from `since` on and the
/// payout records of `settlements`.
pub async fn checkpoint(
    storage: &Storage,
    engine: &RoundEngine,
    since: u64,
    settlements: &[Settlement],
) -> Result<()> {
    let (snapshot, events) = engine.capture(since);
    let payouts = settlements
        .iter()
        .flat_map(|settlement| settlement.payouts.iter().cloned())
        .collect();

    storage
        .commit(&Checkpoint {
            snapshot,
            events,
            payouts,
        })
        .await?;
    Ok(())
}
