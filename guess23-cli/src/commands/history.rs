use super::{format_amount, open_engine};
use comfy_table::{presets::UTF8_FULL, Table};
use guess23_core::{Address, EventStore, GameEvent, PayoutKind, PayoutStatus, Storage};

pub async fn show_history(storage: &Storage, limit: usize) -> anyhow::Result<()> {
    let (engine, _ledger) = open_engine(storage).await?;
    let history = engine.history();

    match history.last_winner() {
        Some(last) => {
            println!("Latest Winner");
            println!("═══════════════════════════════════");
            println!("Round: {}", last.round_id);
            println!("Winner: {}", last.winner);
            println!("Reward: {}", format_amount(last.reward));
            println!("Target: {} wei", last.target);
            println!("Ended: {}", last.ended_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => println!("No round has ended yet."),
    }

    let recent = history.recent(limit);
    if !recent.is_empty() {
        println!();
        println!("Recent Winners:");

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            "Round",
            "Winner",
            "Players",
            "Pool (wei)",
            "Target (wei)",
            "Reward (wei)",
        ]);

        for result in recent {
            let pool = result
                .total_pool()
                .map(|pool| pool.to_string())
                .unwrap_or_else(|| "overflow".to_string());
            table.add_row(vec![
                result.round_id.to_string(),
                result.winner.short(),
                result.players.len().to_string(),
                pool,
                result.target.to_string(),
                result.reward.to_string(),
            ]);
        }

        println!("{}", table);
    }

    let current = history.current_players();
    println!();
    println!(
        "Current Players (round {}): {}/{}",
        engine.round_id(),
        current.len(),
        engine.max_players()
    );
    for entry in current {
        println!("  {} - {} wei", entry.participant, entry.stake);
    }

    if let Some(total) = history.total_paid_out() {
        println!();
        println!("Total paid to winners: {}", format_amount(total));
    }

    Ok(())
}

pub async fn show_events(storage: &Storage, since: u64, json: bool) -> anyhow::Result<()> {
    let events = EventStore::new(storage).load_events_since(since).await?;

    if json {
        for record in &events {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }

    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Seq", "Round", "Event", "Details", "Recorded"]);

    for record in &events {
        let details = match &record.event {
            GameEvent::PlayerJoined { participant, stake } => {
                format!("{} staked {} wei", participant.short(), stake)
            }
            GameEvent::GameEnded {
                winner,
                reward,
                target,
                ..
            } => format!(
                "{} won {} wei (target {})",
                winner.short(),
                reward,
                target
            ),
        };
        table.add_row(vec![
            record.sequence.to_string(),
            record.round_id.to_string(),
            record.event.kind().to_string(),
            details,
            record
                .recorded_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub async fn show_payouts(storage: &Storage, address: Option<&Address>) -> anyhow::Result<()> {
    let store = EventStore::new(storage);
    let payouts = match address {
        Some(address) => store.load_payouts_for(address).await?,
        None => store.load_payouts().await?,
    };

    if payouts.is_empty() {
        println!("No payouts found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Round", "Kind", "Recipient", "Amount (wei)", "Status"]);

    for payout in &payouts {
        let kind = match payout.kind {
            PayoutKind::Fee => "Fee",
            PayoutKind::Reward => "Reward",
        };
        let status = match &payout.status {
            PayoutStatus::Paid => "Paid".to_string(),
            PayoutStatus::Failed { reason } => format!("Failed: {}", reason),
        };
        table.add_row(vec![
            payout.round_id.to_string(),
            kind.to_string(),
            payout.recipient.to_string(),
            payout.amount.to_string(),
            status,
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub async fn show_balances(storage: &Storage) -> anyhow::Result<()> {
    let totals = EventStore::new(storage).paid_totals().await?;

    if totals.is_empty() {
        println!("Nothing has been paid out yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Address", "Received (wei)", "Received (ETH)"]);

    for (address, amount) in &totals {
        table.add_row(vec![
            address.to_string(),
            amount.to_string(),
            amount.to_ether_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
