//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `payments_created_total` - Payments created
//! - `authorizations_total` - Authorization outcomes by result
//! - `transitions_total` - Status transitions applied
//! - `refunds_completed_total` - Refunds completed
//! - `events_appended_total` - Timeline events appended
//! - `command_duration_seconds` - Histogram of ledger command latencies

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};
use std::sync::Arc;

/// Metrics collector
///
/// Each collector owns its registry so independent ledgers (and tests) do
/// not collide on metric names.
#[derive(Clone)]
pub struct Metrics {
    /// Payments created
    pub payments_created: IntCounter,

    /// Authorization outcomes, labeled by result (approved/rejected/pending)
    pub authorizations: IntCounterVec,

    /// Status transitions applied
    pub transitions: IntCounter,

    /// Refunds completed
    pub refunds_completed: IntCounter,

    /// Timeline events appended
    pub events_appended: IntCounter,

    /// Ledger command latency histogram
    pub command_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let payments_created = IntCounter::new("payments_created_total", "Payments created")?;
        registry.register(Box::new(payments_created.clone()))?;

        let authorizations = IntCounterVec::new(
            Opts::new("authorizations_total", "Authorization outcomes by result"),
            &["result"],
        )?;
        registry.register(Box::new(authorizations.clone()))?;

        let transitions = IntCounter::new("transitions_total", "Status transitions applied")?;
        registry.register(Box::new(transitions.clone()))?;

        let refunds_completed =
            IntCounter::new("refunds_completed_total", "Refunds completed")?;
        registry.register(Box::new(refunds_completed.clone()))?;

        let events_appended =
            IntCounter::new("events_appended_total", "Timeline events appended")?;
        registry.register(Box::new(events_appended.clone()))?;

        let command_duration = Histogram::with_opts(
            HistogramOpts::new(
                "command_duration_seconds",
                "Histogram of ledger command latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        Ok(Self {
            payments_created,
            authorizations,
            transitions,
            refunds_completed,
            events_appended,
            command_duration,
            registry,
        })
    }

    /// Record an authorization outcome
    pub fn record_authorization(&self, result: &str) {
        self.authorizations.with_label_values(&[result]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
