use guess23_core::{Address, Wei};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Core error: {0}")]
    Core(#[from] guess23_core::GuessError),

    #[error("Stake must be greater than zero")]
    InvalidStake,

    #[error("Participant {0} already played in this round")]
    AlreadyPlayed(Address),

    #[error("Round {0} is not accepting entries")]
    RoundNotOpen(u64),

    #[error("Transfer of {amount} wei to {recipient} failed: {reason}")]
    TransferFailed {
        recipient: Address,
        amount: Wei,
        reason: String,
    },

    #[error("Reentrant call rejected while a payout is in flight")]
    Reentrant,

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Corrupt game state: {0}")]
    CorruptState(String),

    #[error("No game has been initialized")]
    NotInitialized,

    #[error("A game is already initialized")]
    AlreadyInitialized,
}

impl GameError {
    pub fn overflow(msg: impl Into<String>) -> Self {
        Self::Overflow(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptState(msg.into())
    }
}
