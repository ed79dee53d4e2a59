use thiserror::Error;

pub type Result<T> = std::result::Result<T, GuessError>;

#[derive(Error, Debug)]
pub enum GuessError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Transfer of {amount} wei to {recipient} rejected: {reason}")]
    TransferRejected {
        recipient: String,
        amount: u128,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuessError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn transfer_rejected(
        recipient: impl ToString,
        amount: u128,
        reason: impl Into<String>,
    ) -> Self {
        Self::TransferRejected {
            recipient: recipient.to_string(),
            amount,
            reason: reason.into(),
        }
    }
}
