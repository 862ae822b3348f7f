//! Paylane Payment Core
//!
//! Payment intake and settlement ledger for a marketplace: a payment state
//! machine, a conditional funds-movement primitive, append-only attempt and
//! event logs, and refund reconciliation that never exceeds the authorized
//! total.
//!
//! # Architecture
//!
//! - **Single writer**: one logical writer task eliminates race conditions
//!   on instrument balances and attempt numbering
//! - **Atomic commits**: every command lands as one RocksDB `WriteBatch`
//! - **Append-only audit**: attempts and timeline events are never modified
//!   or deleted
//!
//! # Invariants
//!
//! - `total == subtotal + taxes + fees`, fixed at creation
//! - Instrument balances never go negative
//! - Refund reservations never exceed the authorized total
//! - Attempt numbers per payment are exactly `1..N`, no gaps or duplicates

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod config;
pub mod error;
pub mod funds;
pub mod ledger;
pub mod metrics;
pub mod refunds;
pub mod storage;
pub mod types;

// Re-exports
pub use actor::{LedgerHandle, RefundCompletion, Transition};
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{NoopNotifier, PaymentLedger, TransitionNotifier};
pub use metrics::Metrics;
pub use storage::Storage;
pub use types::{
    Attempt, AttemptStatus, Currency, EventActor, EventType, FundingInstrument, GatewayCommand,
    InstrumentKind, Order, Payment, PaymentDraft, PaymentEvent, PaymentStatus, Refund,
    RefundStatus, StatusUpdate,
};
