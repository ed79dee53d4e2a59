use crate::config::GameConfig;
use crate::error::Result;
use crate::storage::{column_error, Storage};
use crate::types::{Address, Entry, RoundSnapshot, RoundStatus, Wei};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

pub struct RoundStore<'a> {
    storage: &'a Storage,
}

impl<'a> RoundStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Wipes any previous game and writes `config` with an empty round 0.
    pub async fn initialize(&self, config: &GameConfig) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM payouts", [])?;
        tx.execute("DELETE FROM events", [])?;
        tx.execute("DELETE FROM entries", [])?;
        tx.execute("DELETE FROM round_state", [])?;
        tx.execute("DELETE FROM game_config", [])?;

        tx.execute(
            "INSERT INTO game_config (id, config, created_at) VALUES (1, ?1, ?2)",
            params![serde_json::to_string(config)?, Utc::now().timestamp()],
        )?;
        write_round(&tx, &RoundSnapshot::empty(0))?;

        tx.commit()?;

        tracing::info!(
            "Initialized game: {}-{} players, fee {}/{} to {}",
            config.min_players,
            config.max_players,
            config.fee.numerator,
            config.fee.denominator,
            config.fee_recipient
        );
        Ok(())
    }

    pub async fn load_config(&self) -> Result<Option<GameConfig>> {
        let conn = self.storage.get_connection().await;

        let config_json: Option<String> = conn
            .query_row("SELECT config FROM game_config WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match config_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn load_round(&self) -> Result<Option<RoundSnapshot>> {
        let conn = self.storage.get_connection().await;

        let header = conn
            .query_row(
                "SELECT round_id, status, total_pool FROM round_state WHERE id = 1",
                [],
                |row| {
                    let round_id: i64 = row.get(0)?;
                    let status_str: String = row.get(1)?;
                    let pool_str: String = row.get(2)?;

                    let status: RoundStatus = serde_json::from_str(&status_str)
                        .map_err(|_| column_error(1, "status"))?;
                    let total_pool: Wei =
                        pool_str.parse().map_err(|_| column_error(2, "total_pool"))?;

                    Ok((round_id as u64, status, total_pool))
                },
            )
            .optional()?;

        let Some((round_id, status, total_pool)) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT participant, stake, sequence FROM entries
             WHERE round_id = ?1 ORDER BY sequence ASC",
        )?;

        let entry_iter = stmt.query_map(params![round_id as i64], |row| {
            let participant_str: String = row.get(0)?;
            let stake_str: String = row.get(1)?;
            let sequence: i64 = row.get(2)?;

            Ok(Entry {
                participant: Address::parse(&participant_str)
                    .map_err(|_| column_error(0, "participant"))?,
                stake: stake_str.parse().map_err(|_| column_error(1, "stake"))?,
                sequence: u32::try_from(sequence).map_err(|_| column_error(2, "sequence"))?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }

        Ok(Some(RoundSnapshot {
            round_id,
            status,
            entries,
            total_pool,
        }))
    }
}

/// Replaces the stored round with `snapshot`. Entries of earlier rounds are
/// dropped; the event log keeps the history.
pub(crate) fn write_round(conn: &Connection, snapshot: &RoundSnapshot) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO round_state (id, round_id, status, total_pool, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4)",
        params![
            snapshot.round_id as i64,
            serde_json::to_string(&snapshot.status)?,
            snapshot.total_pool.to_string(),
            Utc::now().timestamp(),
        ],
    )?;

    conn.execute("DELETE FROM entries", [])?;
    for entry in &snapshot.entries {
        conn.execute(
            "INSERT INTO entries (round_id, sequence, participant, stake)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                snapshot.round_id as i64,
                entry.sequence as i64,
                entry.participant.as_str(),
                entry.stake.to_string(),
            ],
        )?;
    }

    Ok(())
}
