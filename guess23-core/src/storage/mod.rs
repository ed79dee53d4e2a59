pub mod event_store;
pub mod round_store;

pub use event_store::EventStore;
pub use round_store::RoundStore;

use crate::error::Result;
use crate::types::{EventRecord, PayoutRecord, RoundSnapshot};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

/// Everything one engine call produced, written as a unit.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub snapshot: RoundSnapshot,
    pub events: Vec<EventRecord>,
    pub payouts: Vec<PayoutRecord>,
}

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS game_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                config TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Single row: the active round header
        conn.execute(
            "CREATE TABLE IF NOT EXISTS round_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                round_id INTEGER NOT NULL,
                status TEXT NOT NULL,
                total_pool TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                round_id INTEGER NOT NULL,
                sequence INTEGER NOT NULL,
                participant TEXT NOT NULL,
                stake TEXT NOT NULL,
                PRIMARY KEY (round_id, sequence),
                UNIQUE (round_id, participant)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                sequence INTEGER PRIMARY KEY,
                round_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS payouts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                round_id INTEGER NOT NULL,
                recipient TEXT NOT NULL,
                amount TEXT NOT NULL,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Writes the round snapshot, new events and payout records in one
    /// SQLite transaction.
    pub async fn commit(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        round_store::write_round(&tx, &checkpoint.snapshot)?;
        for record in &checkpoint.events {
            event_store::insert_event(&tx, record)?;
        }
        for payout in &checkpoint.payouts {
            event_store::insert_payout(&tx, payout)?;
        }

        tx.commit()?;

        tracing::debug!(
            "Committed round {} with {} events and {} payouts",
            checkpoint.snapshot.round_id,
            checkpoint.events.len(),
            checkpoint.payouts.len()
        );
        Ok(())
    }
}

/// Maps a JSON or numeric decode failure inside a row closure onto the
/// error type rusqlite expects there.
pub(crate) fn column_error(index: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(index, name.to_string(), rusqlite::types::Type::Text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::types::{
        Address, Entry, GameEvent, PayoutKind, PayoutStatus, RoundStatus, Wei,
    };
    use chrono::Utc;
    use tempfile::tempdir;

    fn alice() -> Address {
        Address::from_bytes([1; 20])
    }

    fn owner() -> Address {
        Address::from_bytes([0xee; 20])
    }

    #[tokio::test]
    async fn test_unwritable_parent_is_io_error() {
        let temp_dir = tempdir().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = Storage::new(&blocker.join("nested").join("guess23.db")).await;
        assert!(matches!(result, Err(crate::error::GuessError::Io(_))));
    }

    #[tokio::test]
    async fn test_initialize_and_load() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("guess23.db"))
            .await
            .unwrap();
        let rounds = RoundStore::new(&storage);

        assert!(rounds.load_config().await.unwrap().is_none());
        assert!(rounds.load_round().await.unwrap().is_none());

        let config = GameConfig::new(2, 3, owner());
        rounds.initialize(&config).await.unwrap();

        assert_eq!(rounds.load_config().await.unwrap(), Some(config));
        assert_eq!(
            rounds.load_round().await.unwrap(),
            Some(RoundSnapshot::empty(0))
        );
    }

    #[tokio::test]
    async fn test_commit_persists_checkpoint() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("guess23.db"))
            .await
            .unwrap();
        RoundStore::new(&storage)
            .initialize(&GameConfig::new(2, 3, owner()))
            .await
            .unwrap();

        let snapshot = RoundSnapshot {
            round_id: 0,
            status: RoundStatus::Open,
            entries: vec![Entry {
                participant: alice(),
                stake: Wei::from_wei(100),
                sequence: 0,
            }],
            total_pool: Wei::from_wei(100),
        };
        let event = EventRecord {
            sequence: 0,
            round_id: 0,
            recorded_at: Utc::now(),
            event: GameEvent::PlayerJoined {
                participant: alice(),
                stake: Wei::from_wei(100),
            },
        };
        let payout = PayoutRecord {
            round_id: 0,
            recipient: owner(),
            amount: Wei::from_wei(6),
            kind: PayoutKind::Fee,
            status: PayoutStatus::Failed {
                reason: "rejected".to_string(),
            },
        };

        storage
            .commit(&Checkpoint {
                snapshot: snapshot.clone(),
                events: vec![event.clone()],
                payouts: vec![payout.clone()],
            })
            .await
            .unwrap();

        let rounds = RoundStore::new(&storage);
        let events = EventStore::new(&storage);
        assert_eq!(rounds.load_round().await.unwrap(), Some(snapshot));
        assert_eq!(events.load_events().await.unwrap(), vec![event]);
        assert_eq!(events.load_payouts().await.unwrap(), vec![payout]);
        assert!(events.paid_totals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_event_sequence_rolls_back() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("guess23.db"))
            .await
            .unwrap();
        RoundStore::new(&storage)
            .initialize(&GameConfig::new(2, 3, owner()))
            .await
            .unwrap();

        let event = EventRecord {
            sequence: 0,
            round_id: 0,
            recorded_at: Utc::now(),
            event: GameEvent::PlayerJoined {
                participant: alice(),
                stake: Wei::from_wei(5),
            },
        };
        let mut snapshot = RoundSnapshot::empty(0);
        snapshot.entries.push(Entry {
            participant: alice(),
            stake: Wei::from_wei(5),
            sequence: 0,
        });
        snapshot.total_pool = Wei::from_wei(5);

        let result = storage
            .commit(&Checkpoint {
                snapshot,
                events: vec![event.clone(), event],
                payouts: Vec::new(),
            })
            .await;
        assert!(result.is_err());

        // Nothing from the failed checkpoint is visible
        let rounds = RoundStore::new(&storage);
        assert_eq!(
            rounds.load_round().await.unwrap(),
            Some(RoundSnapshot::empty(0))
        );
        assert!(EventStore::new(&storage)
            .load_events()
            .await
            .unwrap()
            .is_empty());
    }
}
