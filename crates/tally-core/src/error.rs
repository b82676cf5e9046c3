use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    /// An options or entry payload could not be decoded
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The options bundle decoded but violates the policy rules
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("rank \"{rank}\" not found")]
    RankNotFound { rank: i64 },

    #[error("Key {key:?} holds the wrong kind of value")]
    WrongType { key: String },

    #[error("Lock acquisition timed out after {timeout_ms}ms")]
    LockTimeout { timeout_ms: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl TallyError {
    /// True for errors caused by the caller's input rather than the store
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            TallyError::MalformedPayload(_)
                | TallyError::InvalidOptions(_)
                | TallyError::RankNotFound { .. }
                | TallyError::WrongType { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;
