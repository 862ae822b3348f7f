//! Error types for the settlement scheduler

use thiserror::Error;

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Scheduler errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] payment_core::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
