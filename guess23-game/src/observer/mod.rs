//! Read-only view of the engine: state queries, the append-only event log
//! and the history index built from it.

pub mod history;

pub use history::{GameHistory, PlayerStats, RoundResult};

use crate::engine::RoundEngine;
use crate::{GameError, Result};
use chrono::Utc;
use guess23_core::{Address, Entry, EventRecord, GameConfig, GameEvent, RoundSnapshot, Wei};

/// Append-only, gap-free event log. `records[i].sequence == i`.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<EventRecord>) -> Result<Self> {
        for (index, record) in records.iter().enumerate() {
            if record.sequence != index as u64 {
                return Err(GameError::corrupt(format!(
                    "event at position {} has sequence {}",
                    index, record.sequence
                )));
            }
        }
        Ok(Self { records })
    }

    pub(crate) fn append(&mut self, round_id: u64, event: GameEvent) -> u64 {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            sequence,
            round_id,
            recorded_at: Utc::now(),
            event,
        });
        sequence
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `sequence >= since`
    pub fn since(&self, since: u64) -> &[EventRecord] {
        let start = usize::try_from(since)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of `GameEnded` records, which is the id of the open round.
    pub fn rounds_ended(&self) -> u64 {
        self.records
            .iter()
            .filter(|record| matches!(record.event, GameEvent::GameEnded { .. }))
            .count() as u64
    }

    /// `(participant, stake)` of every join after the last `GameEnded`.
    pub fn open_round_joins(&self) -> Vec<(Address, Wei)> {
        let start = self
            .records
            .iter()
            .rposition(|record| matches!(record.event, GameEvent::GameEnded { .. }))
            .map_or(0, |position| position + 1);

        self.records[start..]
            .iter()
            .filter_map(|record| match &record.event {
                GameEvent::PlayerJoined { participant, stake } => {
                    Some((participant.clone(), *stake))
                }
                GameEvent::GameEnded { .. } => None,
            })
            .collect()
    }
}

impl RoundEngine {
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn round_id(&self) -> u64 {
        self.state.read().round.id()
    }

    pub fn total_pool(&self) -> Wei {
        self.state.read().round.total_pool()
    }

    pub fn min_players(&self) -> u32 {
        self.config.min_players
    }

    pub fn max_players(&self) -> u32 {
        self.config.max_players
    }

    pub fn owner(&self) -> &Address {
        self.config.owner()
    }

    /// Whether `participant` holds an entry in the current round.
    pub fn has_played(&self, participant: &Address) -> bool {
        self.state.read().round.has_played(participant)
    }

    pub fn entry_at(&self, index: usize) -> Option<(Address, Wei)> {
        self.state
            .read()
            .round
            .entry_at(index)
            .map(|entry| (entry.participant.clone(), entry.stake))
    }

    pub fn player_count(&self) -> usize {
        self.state.read().round.len()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.state.read().round.entries().to_vec()
    }

    /// Round id, entries and pool taken under one lock.
    pub fn snapshot(&self) -> RoundSnapshot {
        self.state.read().round.snapshot()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.state.read().log.records().to_vec()
    }

    pub fn events_since(&self, since: u64) -> Vec<EventRecord> {
        self.state.read().log.since(since).to_vec()
    }

    pub fn next_event_sequence(&self) -> u64 {
        self.state.read().log.next_sequence()
    }

    /// Sequence of the newest event, `None` before the first join.
    pub fn last_event_sequence(&self) -> Option<u64> {
        self.next_event_sequence().checked_sub(1)
    }

    /// Snapshot plus the events from `since` on, consistent with each other.
    pub fn capture(&self, since: u64) -> (RoundSnapshot, Vec<EventRecord>) {
        let state = self.state.read();
        (state.round.snapshot(), state.log.since(since).to_vec())
    }

    pub fn history(&self) -> GameHistory {
        GameHistory::from_events(self.state.read().log.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(n: u8, stake: u128) -> GameEvent {
        GameEvent::PlayerJoined {
            participant: Address::from_bytes([n; 20]),
            stake: Wei::from_wei(stake),
        }
    }

    #[test]
    fn test_append_assigns_sequences() {
        let mut log = EventLog::new();
        assert_eq!(log.append(0, joined(1, 10)), 0);
        assert_eq!(log.append(0, joined(2, 20)), 1);

        assert_eq!(log.next_sequence(), 2);
        assert_eq!(log.since(1).len(), 1);
        assert!(log.since(5).is_empty());
        assert!(log.since(u64::MAX).is_empty());
    }

    #[test]
    fn test_last_event_sequence() {
        let engine = RoundEngine::new(
            GameConfig::new(2, 3, Address::from_bytes([0xee; 20])),
            std::sync::Arc::new(guess23_core::InMemoryLedger::new()),
        )
        .unwrap();
        assert_eq!(engine.last_event_sequence(), None);

        engine
            .join(Address::from_bytes([1; 20]), Wei::from_wei(10))
            .unwrap();
        assert_eq!(engine.last_event_sequence(), Some(0));
        assert_eq!(engine.events_since(0).len(), 1);
    }

    #[test]
    fn test_open_round_joins_after_last_end() {
        let mut log = EventLog::new();
        log.append(0, joined(1, 10));
        log.append(
            0,
            GameEvent::GameEnded {
                round_id: 0,
                winner: Address::from_bytes([1; 20]),
                reward: Wei::from_wei(10),
                target: Wei::from_wei(6),
            },
        );
        log.append(1, joined(2, 20));

        assert_eq!(log.rounds_ended(), 1);
        assert_eq!(
            log.open_round_joins(),
            vec![(Address::from_bytes([2; 20]), Wei::from_wei(20))]
        );
    }

    #[test]
    fn test_from_records_rejects_gaps() {
        let mut log = EventLog::new();
        log.append(0, joined(1, 10));
        log.append(0, joined(2, 10));
        let mut records = log.records().to_vec();
        records.remove(0);

        assert!(matches!(
            EventLog::from_records(records),
            Err(GameError::CorruptState(_))
        ));
    }
}
