//! Error types for the payment ledger

use crate::types::PaymentStatus;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Payment ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed request rejected before any state change
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transition requested from a state that does not permit it
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current payment status
        from: PaymentStatus,
        /// Requested payment status
        to: PaymentStatus,
    },

    /// Funds check failed; resolved into a REJECTED transition by the ledger
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    /// Refund exceeds the remaining refundable amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Payment not found
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Refund not found
    #[error("Refund not found: {0}")]
    RefundNotFound(String),

    /// Funding instrument not found
    #[error("Funding instrument not found: {0}")]
    InstrumentNotFound(String),

    /// Authorization retried past the insufficient-funds retry ceiling
    #[error("Retry limit exceeded for payment {0}")]
    RetryLimitExceeded(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl Error {
    /// Stable machine-readable error code for API consumers
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::InvalidStateTransition { .. } => "invalid_state_transition",
            Error::PaymentDeclined(_) => "payment_declined",
            Error::InvalidAmount(_) => "invalid_amount",
            Error::PaymentNotFound(_) => "payment_not_found",
            Error::RefundNotFound(_) => "refund_not_found",
            Error::InstrumentNotFound(_) => "instrument_not_found",
            Error::RetryLimitExceeded(_) => "retry_limit_exceeded",
            Error::Storage(_) => "storage_error",
            Error::Serialization(_) => "serialization_error",
            Error::Concurrency(_) => "concurrency_error",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Other(_) => "internal_error",
        }
    }
}
