pub mod game;
pub mod history;
pub mod simulate;

pub use game::{init_game, join_game, show_played, show_status};
pub use history::{show_balances, show_events, show_history, show_payouts};
pub use simulate::simulate;

use guess23_core::{InMemoryLedger, Storage, Wei};
use guess23_game::{persist, RoundEngine};
use std::sync::Arc;

/// Loads the stored game. Transfers of this session land in the returned
/// ledger; `payouts` keeps the durable record.
pub(crate) async fn open_engine(
    storage: &Storage,
) -> anyhow::Result<(RoundEngine, Arc<InMemoryLedger>)> {
    let ledger = Arc::new(InMemoryLedger::new());
    let engine = persist::load_engine(storage, ledger.clone()).await?;
    Ok((engine, ledger))
}

pub(crate) fn format_amount(amount: Wei) -> String {
    format!("{} wei ({} ETH)", amount, amount.to_ether_string())
}
