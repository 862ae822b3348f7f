//! Settlement scheduler for the payment ledger
//!
//! Payments on funding instruments that require external confirmation park
//! in PENDING_APPROVAL after authorization. This crate runs the periodic
//! sweep that resolves them once they are past the approval delay, using a
//! pluggable decision policy that simulates the external gateway's
//! asynchronous confirmation. The sweep drives the exact same ledger path
//! as an inbound gateway command, so audit trails are indistinguishable.

pub mod error;
pub mod policy;
pub mod sweeper;

pub use error::{Error, Result};
pub use policy::{DecisionPolicy, FixedPolicy, SweepDecision, WeightedPolicy};
pub use sweeper::{SettlementSweeper, SweepConfig, SweepStats};
