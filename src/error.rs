//! Error types for the zerocoin engine

use thiserror::Error;

/// Main error type for mint/spend operations
#[derive(Error, Debug)]
pub enum ZerocoinError {
    // Coin and accumulator errors
    #[error("Invalid coin public value: {0}")]
    InvalidCoinValue(String),

    #[error("Coin commitment already registered: {0}")]
    DuplicateCommitment(String),

    #[error("Coin not in accumulator: {0}")]
    CoinNotInAccumulator(String),

    #[error("Unknown accumulator checksum: {0}")]
    UnknownAccumulatorChecksum(String),

    #[error("Invalid denomination: {0}")]
    InvalidDenomination(u64),

    // Spend errors
    #[error("Double spend of serial: {0}")]
    DoubleSpend(String),

    #[error("Bad spend proof: {0}")]
    BadProof(String),

    #[error("Serial already spent: {0}")]
    SerialAlreadySpent(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Too many spends: {requested} coins selected, limit is {limit}")]
    TooManySpends { requested: usize, limit: usize },

    #[error("Too many mints: {requested} coins needed, limit is {limit}")]
    TooManyMints { requested: u64, limit: usize },

    #[error("Unbalanced spend: inputs {inputs}, amount plus fee plus change {outputs}")]
    UnbalancedSpend { inputs: u64, outputs: u64 },

    #[error("Invalid spend state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Coin secret not found: {0}")]
    CoinSecretNotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ZerocoinError {
    /// Errors that must reject a spend outright, with no retry
    pub fn is_consensus_error(&self) -> bool {
        matches!(
            self,
            Self::DoubleSpend(_)
                | Self::BadProof(_)
                | Self::SerialAlreadySpent(_)
                | Self::UnbalancedSpend { .. }
        )
    }

    /// Errors that warrant recomputing the witness against the latest checkpoint
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UnknownAccumulatorChecksum(_))
    }
}

/// Result type alias for zerocoin operations
pub type Result<T> = std::result::Result<T, ZerocoinError>;
