use crate::{GameError, Result};
use guess23_core::{Address, Entry, RoundSnapshot, RoundStatus, Wei};
use std::collections::HashSet;

/// The active round. Entries live in a growable array that is replaced
/// wholesale when the round closes; sequence numbers are indices into it.
#[derive(Debug)]
pub struct Round {
    id: u64,
    status: RoundStatus,
    entries: Vec<Entry>,
    players: HashSet<Address>,
    total_pool: Wei,
}

/// A round after its close: entries and pool frozen.
#[derive(Debug, Clone)]
pub struct ClosedRound {
    pub id: u64,
    pub entries: Vec<Entry>,
    pub total_pool: Wei,
}

impl ClosedRound {
    pub fn stakes(&self) -> Vec<Wei> {
        self.entries.iter().map(|entry| entry.stake).collect()
    }
}

impl Round {
    pub fn open(id: u64) -> Self {
        Self {
            id,
            status: RoundStatus::Open,
            entries: Vec::new(),
            players: HashSet::new(),
            total_pool: Wei::ZERO,
        }
    }

    /// Rebuilds a round from a stored snapshot, checking every invariant
    /// the engine relies on.
    pub fn from_snapshot(snapshot: RoundSnapshot, max_players: u32) -> Result<Self> {
        if snapshot.status != RoundStatus::Open {
            return Err(GameError::corrupt(format!(
                "round {} stored as {:?}",
                snapshot.round_id, snapshot.status
            )));
        }

        if snapshot.entries.len() >= max_players as usize {
            return Err(GameError::corrupt(format!(
                "round {} holds {} entries with max_players {}",
                snapshot.round_id,
                snapshot.entries.len(),
                max_players
            )));
        }

        let mut players = HashSet::with_capacity(snapshot.entries.len());
        for (index, entry) in snapshot.entries.iter().enumerate() {
            if entry.sequence as usize != index {
                return Err(GameError::corrupt(format!(
                    "entry {} has sequence {}",
                    index, entry.sequence
                )));
            }
            if entry.stake.is_zero() {
                return Err(GameError::corrupt(format!("entry {} has zero stake", index)));
            }
            if !players.insert(entry.participant.clone()) {
                return Err(GameError::corrupt(format!(
                    "participant {} entered twice",
                    entry.participant
                )));
            }
        }

        let sum = Wei::checked_sum(snapshot.entries.iter().map(|entry| entry.stake))
            .ok_or_else(|| GameError::corrupt("entry stakes overflow"))?;
        if sum != snapshot.total_pool {
            return Err(GameError::corrupt(format!(
                "total pool {} does not match entry sum {}",
                snapshot.total_pool, sum
            )));
        }

        Ok(Self {
            id: snapshot.round_id,
            status: RoundStatus::Open,
            entries: snapshot.entries,
            players,
            total_pool: snapshot.total_pool,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_pool(&self) -> Wei {
        self.total_pool
    }

    pub fn has_played(&self, participant: &Address) -> bool {
        self.players.contains(participant)
    }

    pub fn entry_at(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn ensure_open(&self) -> Result<()> {
        if self.status != RoundStatus::Open {
            return Err(GameError::RoundNotOpen(self.id));
        }
        Ok(())
    }

    /// Appends an entry. Callers validate first; this only records.
    pub(crate) fn push(&mut self, participant: Address, stake: Wei, total_pool: Wei) -> u32 {
        let sequence = self.entries.len() as u32;
        self.players.insert(participant.clone());
        self.entries.push(Entry {
            participant,
            stake,
            sequence,
        });
        self.total_pool = total_pool;
        sequence
    }

    /// `Open -> Closing -> Closed`, then opens the next round in place and
    /// hands back the closed one.
    pub(crate) fn close_and_advance(&mut self) -> ClosedRound {
        self.status = RoundStatus::Closing;
        let next = Round::open(self.id + 1);
        let mut closed = std::mem::replace(self, next);
        closed.status = RoundStatus::Closed;

        tracing::debug!("Round {} closed, round {} open", closed.id, self.id);

        ClosedRound {
            id: closed.id,
            entries: closed.entries,
            total_pool: closed.total_pool,
        }
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round_id: self.id,
            status: self.status,
            entries: self.entries.clone(),
            total_pool: self.total_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_push_tracks_pool_and_players() {
        let mut round = Round::open(0);
        round.push(player(1), Wei::from_wei(10), Wei::from_wei(10));
        let sequence = round.push(player(2), Wei::from_wei(5), Wei::from_wei(15));

        assert_eq!(sequence, 1);
        assert_eq!(round.len(), 2);
        assert_eq!(round.total_pool(), Wei::from_wei(15));
        assert!(round.has_played(&player(1)));
        assert!(!round.has_played(&player(3)));
        assert_eq!(round.entry_at(1).map(|e| e.stake), Some(Wei::from_wei(5)));
        assert!(round.entry_at(2).is_none());
    }

    #[test]
    fn test_close_opens_next_round() {
        let mut round = Round::open(7);
        round.push(player(1), Wei::from_wei(10), Wei::from_wei(10));

        let closed = round.close_and_advance();

        assert_eq!(closed.id, 7);
        assert_eq!(closed.stakes(), vec![Wei::from_wei(10)]);
        assert_eq!(round.id(), 8);
        assert_eq!(round.status(), RoundStatus::Open);
        assert!(round.is_empty());
        assert_eq!(round.total_pool(), Wei::ZERO);
        assert!(!round.has_played(&player(1)));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut round = Round::open(3);
        round.push(player(1), Wei::from_wei(10), Wei::from_wei(10));

        let restored = Round::from_snapshot(round.snapshot(), 3).unwrap();
        assert_eq!(restored.snapshot(), round.snapshot());
        assert!(restored.has_played(&player(1)));
    }

    #[test]
    fn test_from_snapshot_rejects_broken_invariants() {
        let entry = |n: u8, stake: u128, sequence: u32| Entry {
            participant: player(n),
            stake: Wei::from_wei(stake),
            sequence,
        };

        let mut bad_pool = RoundSnapshot::empty(0);
        bad_pool.entries.push(entry(1, 10, 0));
        bad_pool.total_pool = Wei::from_wei(11);
        assert!(Round::from_snapshot(bad_pool, 3).is_err());

        let mut duplicate = RoundSnapshot::empty(0);
        duplicate.entries = vec![entry(1, 10, 0), entry(1, 10, 1)];
        duplicate.total_pool = Wei::from_wei(20);
        assert!(Round::from_snapshot(duplicate, 3).is_err());

        let mut full = RoundSnapshot::empty(0);
        full.entries = vec![entry(1, 10, 0), entry(2, 10, 1)];
        full.total_pool = Wei::from_wei(20);
        assert!(Round::from_snapshot(full, 2).is_err());

        let mut gap = RoundSnapshot::empty(0);
        gap.entries = vec![entry(1, 10, 1)];
        gap.total_pool = Wei::from_wei(10);
        assert!(Round::from_snapshot(gap, 3).is_err());

        let mut closed = RoundSnapshot::empty(0);
        closed.status = RoundStatus::Closed;
        assert!(Round::from_snapshot(closed, 3).is_err());
    }
}
