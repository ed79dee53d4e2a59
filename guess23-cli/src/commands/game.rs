use super::{format_amount, open_engine};
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use guess23_core::{Address, FeePolicy, GameConfig, PayoutKind, PayoutStatus, Storage, Wei};
use guess23_game::{persist, Settlement};

pub async fn init_game(
    storage: &Storage,
    min: u32,
    max: u32,
    owner: Address,
    fee_num: u128,
    fee_den: u128,
    force: bool,
) -> anyhow::Result<()> {
    let config = GameConfig::with_fee(min, max, FeePolicy::new(fee_num, fee_den), owner);
    config.validate()?;

    if !force && persist::is_initialized(storage).await? {
        let confirm = Confirm::new()
            .with_prompt("A game already exists. Replace it? Its rounds and history will be lost.")
            .default(false)
            .interact()?;

        if !confirm {
            println!("Initialization cancelled.");
            return Ok(());
        }
    }

    persist::initialize(storage, &config, true).await?;

    println!("Game initialized!");
    println!("Players per round: {}-{}", config.min_players, config.max_players);
    println!(
        "Owner fee: {}/{} to {}",
        config.fee.numerator, config.fee.denominator, config.fee_recipient
    );
    println!();
    println!("Join with:");
    println!("guess23 join <address> <gwei>");

    Ok(())
}

pub async fn join_game(
    storage: &Storage,
    participant: Address,
    amount: u128,
    in_wei: bool,
) -> anyhow::Result<()> {
    let stake = if in_wei {
        Wei::from_wei(amount)
    } else {
        Wei::from_gwei(amount)?
    };

    let (engine, _ledger) = open_engine(storage).await?;
    let since = engine.next_event_sequence();

    let outcome = engine.join(participant.clone(), stake)?;
    let settlements: Vec<Settlement> = outcome.settlement.iter().cloned().collect();
    persist::checkpoint(storage, &engine, since, &settlements).await?;

    println!(
        "{} joined round {} with {}",
        participant,
        outcome.round_id,
        format_amount(stake)
    );
    println!(
        "Position: {}/{}",
        outcome.sequence + 1,
        engine.max_players()
    );

    match &outcome.settlement {
        Some(settlement) => {
            println!();
            print_settlement(settlement);
        }
        None => {
            let missing = engine.max_players() as usize - engine.player_count();
            println!("Waiting for {} more player(s)...", missing);
        }
    }

    Ok(())
}

pub(crate) fn print_settlement(settlement: &Settlement) {
    println!("------ ROUND {} ENDED ------", settlement.round_id);
    println!("═══════════════════════════════════");
    println!("Pool: {}", format_amount(settlement.total_pool));
    println!("Target: {} wei", settlement.target);
    println!(
        "Winner: {} (entry #{})",
        settlement.winner,
        settlement.winner_index + 1
    );
    println!("Reward: {}", format_amount(settlement.reward));
    println!("Fee: {}", format_amount(settlement.fee));

    for payout in &settlement.payouts {
        let label = match payout.kind {
            PayoutKind::Fee => "Fee transfer",
            PayoutKind::Reward => "Reward transfer",
        };
        match &payout.status {
            PayoutStatus::Paid => println!("{}: paid", label),
            PayoutStatus::Failed { reason } => println!("{}: FAILED ({})", label, reason),
        }
    }
}

pub async fn show_status(storage: &Storage) -> anyhow::Result<()> {
    let (engine, _ledger) = open_engine(storage).await?;
    let snapshot = engine.snapshot();

    println!("Round Status: {}", snapshot.round_id);
    println!("═══════════════════════════════════");
    println!("State: {:?}", snapshot.status);
    println!("Pool: {}", format_amount(snapshot.total_pool));
    println!(
        "Players: {}/{} (minimum {})",
        snapshot.entries.len(),
        engine.max_players(),
        engine.min_players()
    );
    println!("Owner: {}", engine.owner());
    println!(
        "Fee: {}/{}",
        engine.config().fee.numerator,
        engine.config().fee.denominator
    );

    if snapshot.entries.is_empty() {
        println!();
        println!("No entries yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Participant", "Stake (wei)", "Stake (gwei)"]);

    for entry in &snapshot.entries {
        table.add_row(vec![
            (entry.sequence + 1).to_string(),
            entry.participant.to_string(),
            entry.stake.to_string(),
            entry.stake.to_gwei_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub async fn show_played(storage: &Storage, participant: &Address) -> anyhow::Result<()> {
    let (engine, _ledger) = open_engine(storage).await?;

    if engine.has_played(participant) {
        println!(
            "{} has a stake in round {}",
            participant,
            engine.round_id()
        );
    } else {
        println!(
            "{} has not played round {}",
            participant,
            engine.round_id()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use guess23_core::EventStore;
    use guess23_game::GameError;
    use tempfile::tempdir;

    fn player(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    async fn storage_with_game(dir: &std::path::Path) -> Storage {
        let storage = Storage::new(&dir.join("guess23.db")).await.unwrap();
        init_game(&storage, 2, 3, player(0xee), 1, 100, true)
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_join_before_init_reports_not_initialized() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("guess23.db"))
            .await
            .unwrap();

        let err = join_game(&storage, player(1), 1, false).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameError>(),
            Some(GameError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn test_init_rejects_bad_bounds() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("guess23.db"))
            .await
            .unwrap();

        assert!(init_game(&storage, 3, 2, player(0xee), 1, 100, true)
            .await
            .is_err());
        assert!(!persist::is_initialized(&storage).await.unwrap());
    }

    #[tokio::test]
    async fn test_joins_persist_across_invocations() {
        let temp_dir = tempdir().unwrap();
        let storage = storage_with_game(temp_dir.path()).await;

        join_game(&storage, player(1), 100, true).await.unwrap();
        join_game(&storage, player(2), 200, true).await.unwrap();
        let err = join_game(&storage, player(2), 5, true).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameError>(),
            Some(GameError::AlreadyPlayed(_))
        ));
        join_game(&storage, player(3), 300, true).await.unwrap();

        let (engine, _) = open_engine(&storage).await.unwrap();
        assert_eq!(engine.round_id(), 1);
        assert_eq!(engine.player_count(), 0);

        let payouts = EventStore::new(&storage).paid_totals().await.unwrap();
        assert_eq!(
            payouts,
            vec![
                (player(1), Wei::from_wei(594)),
                (player(0xee), Wei::from_wei(6)),
            ]
        );
    }

    #[tokio::test]
    async fn test_join_amount_defaults_to_gwei() {
        let temp_dir = tempdir().unwrap();
        let storage = storage_with_game(temp_dir.path()).await;

        join_game(&storage, player(1), 2, false).await.unwrap();

        let (engine, _) = open_engine(&storage).await.unwrap();
        assert_eq!(
            engine.entry_at(0),
            Some((player(1), Wei::from_wei(2_000_000_000)))
        );
        show_status(&storage).await.unwrap();
        show_played(&storage, &player(1)).await.unwrap();
    }
}
