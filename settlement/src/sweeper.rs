//! Periodic settlement sweep
//!
//! Every sweep examines payments parked in PENDING_APPROVAL. A payment is
//! resolved once it is past the approval delay and its instrument actually
//! requires external confirmation; anything else is skipped until the next
//! sweep. One payment's failure never aborts the sweep for the others.
//!
//! A second pass expires pre-terminal payments whose last update is older
//! than the payment TTL.

use crate::policy::{DecisionPolicy, SweepDecision};
use crate::Result;
use chrono::{Duration, Utc};
use payment_core::{EventActor, PaymentLedger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between sweeps
    pub interval_secs: u64,

    /// Seconds a payment must sit in PENDING_APPROVAL before it is resolved
    pub approval_delay_secs: u64,

    /// Seconds a pre-terminal payment may live before expiry
    pub payment_ttl_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            approval_delay_secs: 90,
            payment_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Outcome counts of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Payments examined
    pub examined: usize,
    /// Payments approved by the decision policy
    pub approved: usize,
    /// Payments rejected by the decision policy
    pub rejected: usize,
    /// Payments expired by the TTL pass
    pub expired: usize,
    /// Payments skipped (not yet past the delay, or synchronous instrument)
    pub skipped: usize,
    /// Payments whose processing failed (logged and left for the next sweep)
    pub failed: usize,
}

/// Periodic settlement sweeper
pub struct SettlementSweeper {
    ledger: Arc<PaymentLedger>,
    policy: Arc<dyn DecisionPolicy>,
    config: SweepConfig,
}

impl SettlementSweeper {
    /// Create a new sweeper
    pub fn new(
        ledger: Arc<PaymentLedger>,
        policy: Arc<dyn DecisionPolicy>,
        config: SweepConfig,
    ) -> Self {
        Self {
            ledger,
            policy,
            config,
        }
    }

    /// Run the sweep loop
    pub async fn run(self: Arc<Self>) {
        info!(
            interval_secs = self.config.interval_secs,
            approval_delay_secs = self.config.approval_delay_secs,
            "Starting settlement sweeper"
        );

        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(self.config.interval_secs));

        loop {
            interval.tick().await;

            match self.sweep_once().await {
                Ok(stats) => {
                    if stats.examined > 0 || stats.expired > 0 {
                        info!(
                            examined = stats.examined,
                            approved = stats.approved,
                            rejected = stats.rejected,
                            expired = stats.expired,
                            skipped = stats.skipped,
                            failed = stats.failed,
                            "Settlement sweep completed"
                        );
                    }
                }
                Err(e) => warn!("Settlement sweep failed: {}", e),
            }
        }
    }

    /// Run one sweep over the ledger
    pub async fn sweep_once(&self) -> Result<SweepStats> {
        let mut stats = SweepStats::default();
        let now = Utc::now();
        let delay = Duration::seconds(self.config.approval_delay_secs as i64);

        for payment in self.ledger.awaiting_settlement()? {
            stats.examined += 1;

            // Only instruments that actually wait on external confirmation
            // are resolved here; anything else is skipped every sweep.
            let requires_confirmation = payment
                .instrument_id
                .and_then(|id| self.ledger.instrument(id).ok())
                .map(|i| i.kind.requires_external_confirmation())
                .unwrap_or(false);
            if !requires_confirmation {
                stats.skipped += 1;
                continue;
            }

            if now - payment.updated_at < delay {
                debug!(payment_id = %payment.id, "Payment not yet past approval delay");
                stats.skipped += 1;
                continue;
            }

            let (approve, reason) = match self.policy.decide(&payment) {
                SweepDecision::Approve => (true, "simulated_gateway_approval"),
                SweepDecision::Reject => (false, "simulated_gateway_rejection"),
            };

            // Failures are isolated: log, count, move on to the next payment
            match self
                .ledger
                .finalize_authorization(
                    payment.id,
                    approve,
                    Some(reason.to_string()),
                    EventActor::BankSimulator,
                )
                .await
            {
                Ok(resolved) => {
                    if approve {
                        stats.approved += 1;
                    } else {
                        stats.rejected += 1;
                    }
                    debug!(
                        payment_id = %payment.id,
                        status = %resolved.status,
                        "Swept payment resolved"
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(payment_id = %payment.id, "Failed to settle payment: {}", e);
                }
            }
        }

        for payment in self.ledger.expirable(self.config.payment_ttl_secs)? {
            match self
                .ledger
                .expire(payment.id, Some("payment_ttl_exceeded".to_string()))
                .await
            {
                Ok(_) => stats.expired += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!(payment_id = %payment.id, "Failed to expire payment: {}", e);
                }
            }
        }

        Ok(stats)
    }
}
