use super::{format_amount, open_engine};
use comfy_table::{presets::UTF8_FULL, Table};
use guess23_core::{Address, Storage, Wei};
use guess23_game::{persist, GameError, Settlement};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest random stake, in gwei.
const MAX_STAKE_GWEI: u128 = 1_000_000;

pub async fn simulate(storage: &Storage, rounds: u32, seed: Option<u64>) -> anyhow::Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (engine, ledger) = open_engine(storage).await?;
    let since = engine.next_event_sequence();
    let mut settlements: Vec<Settlement> = Vec::with_capacity(rounds as usize);
    let mut joins = 0u64;

    while settlements.len() < rounds as usize {
        let mut bytes = [0u8; 20];
        rng.fill(&mut bytes[..]);
        let participant = Address::from_bytes(bytes);
        let stake = Wei::from_gwei(rng.gen_range(1..=MAX_STAKE_GWEI))?;

        match engine.join(participant, stake) {
            Ok(outcome) => {
                joins += 1;
                settlements.extend(outcome.settlement);
            }
            Err(GameError::AlreadyPlayed(participant)) => {
                tracing::debug!("Random participant {} drawn twice, skipping", participant);
            }
            Err(e) => return Err(e.into()),
        }
    }

    persist::checkpoint(storage, &engine, since, &settlements).await?;

    println!(
        "Simulated {} rounds with {} joins",
        settlements.len(),
        joins
    );

    if !settlements.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            "Round",
            "Winner",
            "Entry",
            "Pool (gwei)",
            "Target (gwei)",
            "Reward (gwei)",
        ]);

        for settlement in &settlements {
            table.add_row(vec![
                settlement.round_id.to_string(),
                settlement.winner.short(),
                (settlement.winner_index + 1).to_string(),
                settlement.total_pool.to_gwei_string(),
                settlement.target.to_gwei_string(),
                settlement.reward.to_gwei_string(),
            ]);
        }

        println!("{}", table);
    }

    let fees = ledger.balance_of(engine.owner());
    println!("Owner fees this run: {}", format_amount(fees));
    println!(
        "Open round {}: {}/{} players",
        engine.round_id(),
        engine.player_count(),
        engine.max_players()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use guess23_core::{EventStore, GameConfig};
    use tempfile::tempdir;

    async fn storage_with_game(dir: &std::path::Path) -> Storage {
        let storage = Storage::new(&dir.join("guess23.db")).await.unwrap();
        persist::initialize(
            &storage,
            &GameConfig::new(2, 4, Address::from_bytes([0xee; 20])),
            false,
        )
        .await
        .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_simulate_completes_requested_rounds() {
        let temp_dir = tempdir().unwrap();
        let storage = storage_with_game(temp_dir.path()).await;

        simulate(&storage, 3, Some(7)).await.unwrap();

        let (engine, _) = open_engine(&storage).await.unwrap();
        assert_eq!(engine.round_id(), 3);
        assert_eq!(engine.player_count(), 0);
        assert_eq!(engine.history().results().len(), 3);

        let payouts = EventStore::new(&storage).load_payouts().await.unwrap();
        assert_eq!(payouts.len(), 6);
        assert!(payouts.iter().all(|p| p.is_paid()));
    }

    #[tokio::test]
    async fn test_simulate_continues_partial_round() {
        let temp_dir = tempdir().unwrap();
        let storage = storage_with_game(temp_dir.path()).await;

        crate::commands::join_game(&storage, Address::from_bytes([1; 20]), 5, false)
            .await
            .unwrap();
        simulate(&storage, 2, Some(42)).await.unwrap();

        let (engine, _) = open_engine(&storage).await.unwrap();
        assert_eq!(engine.round_id(), 2);
        let history = engine.history();
        let first = &history.results()[0];
        assert_eq!(first.players.len(), 4);
        assert_eq!(first.players[0].participant, Address::from_bytes([1; 20]));
    }

    #[tokio::test]
    async fn test_seeded_runs_are_repeatable() {
        let first_dir = tempdir().unwrap();
        let second_dir = tempdir().unwrap();
        let first = storage_with_game(first_dir.path()).await;
        let second = storage_with_game(second_dir.path()).await;

        simulate(&first, 2, Some(99)).await.unwrap();
        simulate(&second, 2, Some(99)).await.unwrap();

        let winners = |events: Vec<guess23_core::EventRecord>| {
            events.into_iter().map(|r| r.event).collect::<Vec<_>>()
        };
        assert_eq!(
            winners(EventStore::new(&first).load_events().await.unwrap()),
            winners(EventStore::new(&second).load_events().await.unwrap())
        );
    }
}
