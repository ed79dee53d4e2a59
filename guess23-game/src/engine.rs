use crate::observer::EventLog;
use crate::payout::{self, Payout};
use crate::round::{ClosedRound, Round};
use crate::{GameError, Result};
use guess23_core::{
    Address, EventRecord, GameConfig, GameEvent, Ledger, PayoutKind, PayoutRecord, PayoutStatus,
    RoundSnapshot, Wei,
};
use parking_lot::{ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::Arc;

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// Round the stake went into.
    pub round_id: u64,
    pub sequence: u32,
    /// Present when this join filled the round.
    pub settlement: Option<Settlement>,
}

/// Outcome of a closed round and what happened to its two transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub round_id: u64,
    pub winner: Address,
    pub winner_index: usize,
    pub target: Wei,
    pub reward: Wei,
    pub fee: Wei,
    pub total_pool: Wei,
    pub payouts: Vec<PayoutRecord>,
}

impl Settlement {
    pub fn all_paid(&self) -> bool {
        self.payouts.iter().all(PayoutRecord::is_paid)
    }

    /// First failed transfer as an error. The round stays closed either way.
    pub fn ensure_paid(&self) -> Result<()> {
        for payout in &self.payouts {
            if let PayoutStatus::Failed { reason } = &payout.status {
                return Err(GameError::TransferFailed {
                    recipient: payout.recipient.clone(),
                    amount: payout.amount,
                    reason: reason.clone(),
                });
            }
        }
        Ok(())
    }
}

pub(crate) struct EngineState {
    pub(crate) round: Round,
    pub(crate) log: EventLog,
}

/// Closed round waiting for its transfers.
struct PendingPayout {
    closed: ClosedRound,
    winner: Address,
    payout: Payout,
}

/// Marks a payout in flight for as long as it lives.
struct PayoutGuard<'a> {
    in_payout: &'a Cell<bool>,
}

impl<'a> PayoutGuard<'a> {
    fn enter(in_payout: &'a Cell<bool>) -> Self {
        in_payout.set(true);
        Self { in_payout }
    }
}

impl Drop for PayoutGuard<'_> {
    fn drop(&mut self) {
        self.in_payout.set(false);
    }
}

/// Single-writer round engine.
///
/// Every mutating call runs under `writer`, so joins never interleave. The
/// round and event log sit behind `state`, which is write-locked only while
/// a join commits; readers therefore see either the state before a join or
/// the state after it, never a mix. Transfers run after the commit with the
/// `state` lock released and the `writer` lock still held. The flag inside
/// `writer` turns any nested `join` from a transfer into
/// [`GameError::Reentrant`].
pub struct RoundEngine {
    pub(crate) config: GameConfig,
    ledger: Arc<dyn Ledger>,
    writer: ReentrantMutex<Cell<bool>>,
    pub(crate) state: RwLock<EngineState>,
}

impl RoundEngine {
    pub fn new(config: GameConfig, ledger: Arc<dyn Ledger>) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            "Game engine started: {}-{} players, owner {}",
            config.min_players,
            config.max_players,
            config.fee_recipient
        );

        Ok(Self {
            config,
            ledger,
            writer: ReentrantMutex::new(Cell::new(false)),
            state: RwLock::new(EngineState {
                round: Round::open(0),
                log: EventLog::new(),
            }),
        })
    }

    /// Rebuilds an engine from persisted state. The snapshot must agree with
    /// the event log: its id equals the number of ended rounds and its
    /// entries are exactly the joins logged since the last end.
    pub fn restore(
        config: GameConfig,
        ledger: Arc<dyn Ledger>,
        snapshot: RoundSnapshot,
        events: Vec<EventRecord>,
    ) -> Result<Self> {
        config.validate()?;

        let round = Round::from_snapshot(snapshot, config.max_players)?;
        let log = EventLog::from_records(events)?;

        if log.rounds_ended() != round.id() {
            return Err(GameError::corrupt(format!(
                "round {} open but {} rounds ended in the event log",
                round.id(),
                log.rounds_ended()
            )));
        }

        let logged: Vec<(Address, Wei)> = log.open_round_joins();
        let stored: Vec<(Address, Wei)> = round
            .entries()
            .iter()
            .map(|entry| (entry.participant.clone(), entry.stake))
            .collect();
        if logged != stored {
            return Err(GameError::corrupt(format!(
                "round {} entries disagree with the event log",
                round.id()
            )));
        }

        tracing::info!(
            "Restored round {} with {} entries and {} events",
            round.id(),
            round.len(),
            log.len()
        );

        Ok(Self {
            config,
            ledger,
            writer: ReentrantMutex::new(Cell::new(false)),
            state: RwLock::new(EngineState { round, log }),
        })
    }

    /// Stakes `stake` for `participant` in the open round. When the entry
    /// fills the round, the round closes, the next round opens and the
    /// payout is dispatched, all within this call.
    pub fn join(&self, participant: Address, stake: Wei) -> Result<JoinOutcome> {
        let writer = self.writer.lock();
        if writer.get() {
            tracing::warn!("Rejected reentrant join from {} during payout", participant);
            return Err(GameError::Reentrant);
        }

        let (round_id, sequence, pending) = self.commit_join(participant, stake)?;

        let settlement = pending.map(|pending| {
            let _guard = PayoutGuard::enter(&writer);
            self.dispatch(pending)
        });

        Ok(JoinOutcome {
            round_id,
            sequence,
            settlement,
        })
    }

    /// Plain value transfer into the game; same as [`join`](Self::join).
    pub fn receive(&self, from: Address, value: Wei) -> Result<JoinOutcome> {
        self.join(from, value)
    }

    /// Validates, then records the entry and, if it fills the round, closes
    /// it and opens the next one. Every fallible step happens before the
    /// first mutation.
    fn commit_join(
        &self,
        participant: Address,
        stake: Wei,
    ) -> Result<(u64, u32, Option<PendingPayout>)> {
        let mut state = self.state.write();

        state.round.ensure_open()?;
        if stake.is_zero() {
            return Err(GameError::InvalidStake);
        }
        if state.round.has_played(&participant) {
            return Err(GameError::AlreadyPlayed(participant));
        }

        let total_pool = state.round.total_pool().checked_add(stake).ok_or_else(|| {
            GameError::overflow(format!(
                "pool {} plus stake {}",
                state.round.total_pool(),
                stake
            ))
        })?;

        let fills_round = state.round.len() + 1 >= self.config.max_players as usize;
        let closing = if fills_round {
            let mut stakes: Vec<Wei> = state.round.entries().iter().map(|e| e.stake).collect();
            stakes.push(stake);
            let payout = payout::calculate(&stakes, total_pool, &self.config.fee)?;
            let winner = state
                .round
                .entry_at(payout.winner_index)
                .map(|entry| entry.participant.clone())
                .unwrap_or_else(|| participant.clone());
            Some((payout, winner))
        } else {
            None
        };

        let round_id = state.round.id();
        let sequence = state.round.push(participant.clone(), stake, total_pool);
        state.log.append(
            round_id,
            GameEvent::PlayerJoined {
                participant: participant.clone(),
                stake,
            },
        );

        tracing::info!(
            "Player {} joined round {} with {} wei ({}/{})",
            participant,
            round_id,
            stake,
            sequence + 1,
            self.config.max_players
        );

        let pending = closing.map(|(payout, winner)| {
            let closed = state.round.close_and_advance();
            state.log.append(
                closed.id,
                GameEvent::GameEnded {
                    round_id: closed.id,
                    winner: winner.clone(),
                    reward: payout.reward,
                    target: payout.target,
                },
            );

            tracing::info!(
                "Round {} ended: target {}, winner {} takes {} wei (fee {})",
                closed.id,
                payout.target,
                winner,
                payout.reward,
                payout.fee
            );

            PendingPayout {
                closed,
                winner,
                payout,
            }
        });

        Ok((round_id, sequence, pending))
    }

    /// Runs both transfers. Failures are recorded, never rolled back.
    fn dispatch(&self, pending: PendingPayout) -> Settlement {
        let PendingPayout {
            closed,
            winner,
            payout,
        } = pending;

        let fee = self.pay(
            closed.id,
            &self.config.fee_recipient,
            payout.fee,
            PayoutKind::Fee,
        );
        let reward = self.pay(closed.id, &winner, payout.reward, PayoutKind::Reward);

        Settlement {
            round_id: closed.id,
            winner,
            winner_index: payout.winner_index,
            target: payout.target,
            reward: payout.reward,
            fee: payout.fee,
            total_pool: closed.total_pool,
            payouts: vec![fee, reward],
        }
    }

    fn pay(&self, round_id: u64, recipient: &Address, amount: Wei, kind: PayoutKind) -> PayoutRecord {
        let status = if amount.is_zero() {
            PayoutStatus::Paid
        } else {
            match self.ledger.transfer(recipient, amount) {
                Ok(()) => PayoutStatus::Paid,
                Err(e) => {
                    tracing::warn!(
                        "Round {} {:?} transfer of {} wei to {} failed: {}",
                        round_id,
                        kind,
                        amount,
                        recipient,
                        e
                    );
                    PayoutStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        };

        PayoutRecord {
            round_id,
            recipient: recipient.clone(),
            amount,
            kind,
            status,
        }
    }
}

impl std::fmt::Debug for RoundEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("RoundEngine")
            .field("config", &self.config)
            .field("round_id", &state.round.id())
            .field("entries", &state.round.len())
            .field("total_pool", &state.round.total_pool())
            .field("events", &state.log.len())
            .finish()
    }
}
