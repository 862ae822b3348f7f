//! Paylane payment engine service
//!
//! Wires the payment ledger to its edges: an actix-web HTTP API, NATS
//! consumers for inbound coordination requests and commands, outbound
//! status/timeline publication, and the settlement sweep loop.

pub mod config;
pub mod consumer;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notifier;

pub use config::Config;
pub use error::EngineError;
