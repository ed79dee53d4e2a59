//! Guess 2/3 core library
//!
//! Value types, game configuration, the outbound-transfer seam and SQLite
//! persistence shared by the round engine and its front ends.

pub mod config;
pub mod error;
pub mod ledger;
pub mod storage;
pub mod types;

pub use config::{FeePolicy, GameConfig};
pub use error::{GuessError, Result};
pub use ledger::{InMemoryLedger, Ledger};
pub use storage::{Checkpoint, EventStore, RoundStore, Storage};
pub use types::{
    Address, Entry, EventRecord, GameEvent, PayoutKind, PayoutRecord, PayoutStatus,
    RoundSnapshot, RoundStatus, Wei,
};
