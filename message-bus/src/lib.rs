//! Coordination gateway message bus
//!
//! NATS plumbing through which external services request payment actions
//! and receive status notifications: a typed message envelope (carrying the
//! id used for idempotent delivery), a publisher with bounded retry, and a
//! subscriber dispatching to a handler trait.

pub mod client;
pub mod error;
pub mod message;
pub mod metrics;
pub mod publisher;
pub mod subscriber;
pub mod types;

pub use client::NatsClient;
pub use error::{Error, Result};
pub use message::Message;
pub use publisher::{Publisher, PublisherConfig};
pub use subscriber::{MessageHandler, Subscriber};
pub use types::{MessageType, PartitionKey};
