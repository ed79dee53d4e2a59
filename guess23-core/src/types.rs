use crate::error::{GuessError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const WEI_PER_GWEI: u128 = 1_000_000_000;
const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Native currency amount in wei. Arithmetic is checked; there is no
/// wrapping or saturating path. Serialized as a decimal string so values
/// above 2^53 survive JSON consumers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Wei(u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    pub fn from_gwei(gwei: u128) -> Result<Self> {
        gwei.checked_mul(WEI_PER_GWEI)
            .map(Self)
            .ok_or_else(|| GuessError::invalid_amount(format!("{} gwei overflows", gwei)))
    }

    pub const fn to_wei(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Wei) -> Option<Wei> {
        self.0.checked_add(rhs.0).map(Wei)
    }

    pub fn checked_sub(self, rhs: Wei) -> Option<Wei> {
        self.0.checked_sub(rhs.0).map(Wei)
    }

    pub fn checked_mul(self, rhs: u128) -> Option<Wei> {
        self.0.checked_mul(rhs).map(Wei)
    }

    pub fn checked_div(self, rhs: u128) -> Option<Wei> {
        self.0.checked_div(rhs).map(Wei)
    }

    /// Sum of `amounts`, `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Wei>>(amounts: I) -> Option<Wei> {
        amounts
            .into_iter()
            .try_fold(Wei::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// Distance between two amounts, never negative.
    pub fn abs_diff(self, other: Wei) -> Wei {
        Wei(self.0.abs_diff(other.0))
    }

    /// Whole gwei, remainder dropped.
    pub fn to_gwei_string(self) -> String {
        (self.0 / WEI_PER_GWEI).to_string()
    }

    /// Decimal ether without floating point, trailing zeros trimmed.
    pub fn to_ether_string(self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{:018}", frac);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Wei {
    type Err = GuessError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u128>()
            .map(Wei)
            .map_err(|e| GuessError::invalid_amount(format!("'{}': {}", s, e)))
    }
}

impl TryFrom<String> for Wei {
    type Error = GuessError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Wei> for String {
    fn from(wei: Wei) -> Self {
        wei.0.to_string()
    }
}

/// Participant identity: a 20-byte account address rendered as lowercase
/// `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| GuessError::invalid_address(format!("'{}' is missing 0x prefix", s)))?;

        if body.len() != 40 {
            return Err(GuessError::invalid_address(format!(
                "'{}' must have 40 hex digits, found {}",
                s,
                body.len()
            )));
        }

        hex::decode(body)
            .map_err(|e| GuessError::invalid_address(format!("'{}': {}", s, e)))?;

        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234...abcd`, for tables.
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = GuessError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = GuessError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    Open,
    Closing,
    Closed,
}

/// One participant's stake in a round. `sequence` is the zero-based join
/// order and only matters for tie-breaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub participant: Address,
    pub stake: Wei,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round_id: u64,
    pub status: RoundStatus,
    pub entries: Vec<Entry>,
    pub total_pool: Wei,
}

impl RoundSnapshot {
    pub fn empty(round_id: u64) -> Self {
        Self {
            round_id,
            status: RoundStatus::Open,
            entries: Vec::new(),
            total_pool: Wei::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    PlayerJoined {
        participant: Address,
        stake: Wei,
    },
    GameEnded {
        round_id: u64,
        winner: Address,
        reward: Wei,
        target: Wei,
    },
}

impl GameEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::PlayerJoined { .. } => "PlayerJoined",
            GameEvent::GameEnded { .. } => "GameEnded",
        }
    }
}

/// A `GameEvent` at its position in the append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub round_id: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: GameEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutKind {
    Fee,
    Reward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutStatus {
    Paid,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub round_id: u64,
    pub recipient: Address,
    pub amount: Wei,
    pub kind: PayoutKind,
    pub status: PayoutStatus,
}

impl PayoutRecord {
    pub fn is_paid(&self) -> bool {
        matches!(self.status, PayoutStatus::Paid)
    }
}
