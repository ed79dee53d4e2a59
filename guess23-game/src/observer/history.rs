use crate::{GameError, Result};
use chrono::{DateTime, Utc};
use guess23_core::{Address, Entry, EventRecord, GameEvent, Wei};
use serde::{Deserialize, Serialize};

/// One finished round as reconstructed from the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_id: u64,
    pub winner: Address,
    pub reward: Wei,
    pub target: Wei,
    pub ended_at: DateTime<Utc>,
    pub players: Vec<Entry>,
}

impl RoundResult {
    pub fn total_pool(&self) -> Option<Wei> {
        Wei::checked_sum(self.players.iter().map(|entry| entry.stake))
    }

    /// Whatever the reward leaves of the pool.
    pub fn fee(&self) -> Option<Wei> {
        self.total_pool()?.checked_sub(self.reward)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub rounds_played: u64,
    pub wins: u64,
    pub total_staked: Wei,
    pub total_won: Wei,
}

/// Game history indexed from `PlayerJoined`/`GameEnded` records, the same
/// way an external indexer would rebuild it.
#[derive(Debug, Clone, Default)]
pub struct GameHistory {
    results: Vec<RoundResult>,
    current: Vec<Entry>,
}

impl GameHistory {
    pub fn from_events(records: &[EventRecord]) -> Self {
        let mut history = Self::default();
        for record in records {
            history.apply(record);
        }
        history
    }

    pub fn apply(&mut self, record: &EventRecord) {
        match &record.event {
            GameEvent::PlayerJoined { participant, stake } => {
                self.current.push(Entry {
                    participant: participant.clone(),
                    stake: *stake,
                    sequence: self.current.len() as u32,
                });
            }
            GameEvent::GameEnded {
                round_id,
                winner,
                reward,
                target,
            } => {
                self.results.push(RoundResult {
                    round_id: *round_id,
                    winner: winner.clone(),
                    reward: *reward,
                    target: *target,
                    ended_at: record.recorded_at,
                    players: std::mem::take(&mut self.current),
                });
            }
        }
    }

    /// Finished rounds, oldest first
    pub fn results(&self) -> &[RoundResult] {
        &self.results
    }

    pub fn last_winner(&self) -> Option<&RoundResult> {
        self.results.last()
    }

    /// Up to `limit` finished rounds, newest first.
    pub fn recent(&self, limit: usize) -> Vec<&RoundResult> {
        self.results.iter().rev().take(limit).collect()
    }

    /// Joins since the last finished round.
    pub fn current_players(&self) -> &[Entry] {
        &self.current
    }

    pub fn player_stats(&self, player: &Address) -> Result<PlayerStats> {
        let mut stats = PlayerStats::default();
        let overflow = || GameError::overflow(format!("stats for {}", player));

        let all_entries = self
            .results
            .iter()
            .flat_map(|result| result.players.iter())
            .chain(self.current.iter());
        for entry in all_entries.filter(|entry| &entry.participant == player) {
            stats.rounds_played += 1;
            stats.total_staked = stats
                .total_staked
                .checked_add(entry.stake)
                .ok_or_else(overflow)?;
        }

        for result in self.results.iter().filter(|result| &result.winner == player) {
            stats.wins += 1;
            stats.total_won = stats
                .total_won
                .checked_add(result.reward)
                .ok_or_else(overflow)?;
        }

        Ok(stats)
    }

    pub fn total_paid_out(&self) -> Option<Wei> {
        Wei::checked_sum(self.results.iter().map(|result| result.reward))
    }
}
