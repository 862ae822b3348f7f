//! Error types for the message bus

use thiserror::Error;

/// Result type for bus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message bus errors
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Publish error
    #[error("Publish error: {0}")]
    Publish(String),

    /// Subscribe error
    #[error("Subscribe error: {0}")]
    Subscribe(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Publish timed out after all retries
    #[error("Publish timed out on subject {0}")]
    PublishTimeout(String),

    /// Handler rejected the message
    #[error("Handler error: {0}")]
    Handler(String),
}
