//! Main ledger orchestration layer
//!
//! This module ties together storage, the funds-movement primitive and the
//! writer actor into a high-level API for payment processing.
//!
//! # Example
//!
//! ```no_run
//! use payment_core::{Config, PaymentLedger};
//!
//! #[tokio::main]
//! async fn main() -> payment_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = PaymentLedger::open(config).await?;
//!
//!     // let payment = ledger.create_payment(draft).await?;
//!     // ledger.authorize(payment.id).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle, Transition},
    metrics::Metrics,
    refunds,
    types::{
        Attempt, EventActor, FundingInstrument, GatewayCommand, InstrumentKind, Order, Payment,
        PaymentDraft, PaymentEvent, PaymentStatus, Refund, StatusUpdate,
    },
    Config, Result, Storage,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Observer of payment transitions and timeline events
///
/// The service implements this over the coordination gateway; the default
/// is a no-op so the core stays independent of any transport.
#[async_trait]
pub trait TransitionNotifier: Send + Sync {
    /// Called after every successful status transition
    async fn status_changed(&self, update: &StatusUpdate);

    /// Called for every appended timeline event (external audit consumers)
    async fn event_appended(&self, event: &PaymentEvent);
}

/// Notifier that drops everything
pub struct NoopNotifier;

#[async_trait]
impl TransitionNotifier for NoopNotifier {
    async fn status_changed(&self, _update: &StatusUpdate) {}
    async fn event_appended(&self, _event: &PaymentEvent) {}
}

/// Main payment ledger interface
pub struct PaymentLedger {
    /// Actor handle for writes
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Transition observer
    notifier: Arc<dyn TransitionNotifier>,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl PaymentLedger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let handle = spawn_ledger_actor(
            storage.clone(),
            config.payments.clone(),
            config.mailbox_capacity,
        );

        Ok(Self {
            handle,
            storage,
            notifier: Arc::new(NoopNotifier),
            metrics: Metrics::default(),
            config,
        })
    }

    /// Set the transition notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn TransitionNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Metrics collector for this ledger
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration in effect
    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn publish(&self, transition: &Transition) {
        for event in &transition.events {
            self.metrics.events_appended.inc();
            self.notifier.event_appended(event).await;
        }

        if transition.changed() {
            self.metrics.transitions.inc();
            let update = StatusUpdate {
                payment_id: transition.payment.id,
                request_id: transition.payment.request_id,
                old_status: transition.previous,
                new_status: transition.payment.status,
                reason: transition.reason.clone(),
                amount_total: transition.payment.total,
                currency: transition.payment.currency,
                gateway_txn_id: transition.gateway_txn_id.clone(),
                updated_at: transition.payment.updated_at,
            };
            self.notifier.status_changed(&update).await;
        }
    }

    /// Create a payment in PENDING_PAYMENT; no funds move yet
    pub async fn create_payment(&self, draft: PaymentDraft) -> Result<Payment> {
        let timer = self.metrics.command_duration.start_timer();
        let transition = self.handle.create_payment(draft).await?;
        timer.observe_duration();

        self.metrics.payments_created.inc();
        self.publish(&transition).await;
        Ok(transition.payment)
    }

    /// Register a funding instrument
    pub async fn create_instrument(
        &self,
        kind: InstrumentKind,
        currency: crate::types::Currency,
        balance: Decimal,
    ) -> Result<FundingInstrument> {
        self.handle
            .create_instrument(FundingInstrument::new(kind, currency, balance))
            .await
    }

    /// Credit funds onto an instrument
    pub async fn top_up_instrument(
        &self,
        instrument_id: Uuid,
        amount: Decimal,
    ) -> Result<FundingInstrument> {
        self.handle.top_up_instrument(instrument_id, amount).await
    }

    /// Attach a funding instrument to a pending payment
    pub async fn select_instrument(
        &self,
        payment_id: Uuid,
        instrument_id: Uuid,
    ) -> Result<Payment> {
        let transition = self.handle.select_instrument(payment_id, instrument_id).await?;
        self.publish(&transition).await;
        Ok(transition.payment)
    }

    /// Authorize a payment against its funding instrument
    ///
    /// Declines resolve into a REJECTED payment with the attempt and events
    /// recorded; they are returned as a normal payment, not an error.
    pub async fn authorize(&self, payment_id: Uuid) -> Result<Payment> {
        let timer = self.metrics.command_duration.start_timer();
        let transition = self
            .handle
            .authorize(payment_id, EventActor::System, false)
            .await?;
        timer.observe_duration();

        self.metrics
            .record_authorization(authorization_result(&transition.payment.status));
        self.publish(&transition).await;
        Ok(transition.payment)
    }

    /// Retry authorization after an insufficient-funds decline
    ///
    /// Permitted at most `max_retry_attempts` times per payment.
    pub async fn retry(&self, payment_id: Uuid) -> Result<Payment> {
        let transition = self
            .handle
            .authorize(payment_id, EventActor::User, true)
            .await?;

        self.metrics
            .record_authorization(authorization_result(&transition.payment.status));
        self.publish(&transition).await;
        Ok(transition.payment)
    }

    /// Resolve a payment parked in PENDING_APPROVAL
    ///
    /// Used by the settlement sweep and by inbound gateway confirmations so
    /// both leave identical audit trails.
    pub async fn finalize_authorization(
        &self,
        payment_id: Uuid,
        approve: bool,
        reason: Option<String>,
        actor: EventActor,
    ) -> Result<Payment> {
        let transition = self
            .handle
            .finalize_authorization(payment_id, approve, reason, actor)
            .await?;

        if transition.changed() {
            self.metrics
                .record_authorization(authorization_result(&transition.payment.status));
        }
        self.publish(&transition).await;
        Ok(transition.payment)
    }

    /// Apply an inbound gateway command
    ///
    /// Re-applying a command whose target state already holds is a no-op.
    pub async fn apply_command(
        &self,
        payment_id: Uuid,
        command: GatewayCommand,
        reason: Option<String>,
    ) -> Result<Payment> {
        match command {
            GatewayCommand::Approve | GatewayCommand::Capture => {
                self.finalize_authorization(payment_id, true, reason, EventActor::Gateway)
                    .await
            }
            GatewayCommand::Reject => {
                self.finalize_authorization(payment_id, false, reason, EventActor::Gateway)
                    .await
            }
            GatewayCommand::Cancel => {
                let transition = self
                    .handle
                    .apply_status(payment_id, PaymentStatus::Cancelled, reason, EventActor::Gateway)
                    .await?;
                self.publish(&transition).await;
                Ok(transition.payment)
            }
        }
    }

    /// Expire a pre-terminal payment past its TTL
    pub async fn expire(&self, payment_id: Uuid, reason: Option<String>) -> Result<Payment> {
        let transition = self
            .handle
            .apply_status(payment_id, PaymentStatus::Expired, reason, EventActor::System)
            .await?;
        self.publish(&transition).await;
        Ok(transition.payment)
    }

    /// Create a pending refund; no funds move yet
    pub async fn create_refund(
        &self,
        payment_id: Uuid,
        amount: Decimal,
        reason: String,
        requested_by: Uuid,
    ) -> Result<Refund> {
        self.handle
            .create_refund(payment_id, amount, reason, requested_by)
            .await
    }

    /// Approve or decline a pending refund
    pub async fn review_refund(
        &self,
        refund_id: Uuid,
        approve: bool,
        reviewer: Uuid,
        message: Option<String>,
    ) -> Result<Refund> {
        self.handle
            .review_refund(refund_id, approve, reviewer, message)
            .await
    }

    /// Complete a refund: credit the instrument and, when the completion
    /// exhausts the authorized total, transition the payment to REFUNDED
    pub async fn complete_refund(&self, refund_id: Uuid) -> Result<Refund> {
        let completion = self
            .handle
            .complete_refund(refund_id, EventActor::System)
            .await?;

        self.metrics.refunds_completed.inc();
        if let Some(ref transition) = completion.transition {
            self.publish(transition).await;
        }
        Ok(completion.refund)
    }

    // Reads (direct storage access)

    /// Get payment by ID
    pub fn payment(&self, payment_id: Uuid) -> Result<Payment> {
        self.storage.get_payment(payment_id)
    }

    /// Get instrument by ID
    pub fn instrument(&self, instrument_id: Uuid) -> Result<FundingInstrument> {
        self.storage.get_instrument(instrument_id)
    }

    /// Get refund by ID
    pub fn refund(&self, refund_id: Uuid) -> Result<Refund> {
        self.storage.get_refund(refund_id)
    }

    /// Event timeline for a payment, in the requested order
    pub fn timeline(&self, payment_id: Uuid, order: Order) -> Result<Vec<PaymentEvent>> {
        let mut events = self.storage.events_for(payment_id)?;
        if order == Order::Descending {
            events.reverse();
        }
        Ok(events)
    }

    /// Attempts recorded for a payment, in attempt-number order
    pub fn attempts(&self, payment_id: Uuid) -> Result<Vec<Attempt>> {
        self.storage.attempts_for(payment_id)
    }

    /// Whether a payment has used up `max` authorization attempts
    pub fn has_exceeded_max_attempts(&self, payment_id: Uuid, max: u32) -> Result<bool> {
        Ok(self.storage.attempt_count(payment_id)? > max)
    }

    /// Refunds recorded against a payment
    pub fn refunds(&self, payment_id: Uuid) -> Result<Vec<Refund>> {
        self.storage.refunds_for(payment_id)
    }

    /// Remaining refundable amount, recomputed from storage on every call
    pub fn remaining_refundable(&self, payment_id: Uuid) -> Result<Decimal> {
        let payment = self.storage.get_payment(payment_id)?;
        let refunds = self.storage.refunds_for(payment_id)?;
        Ok(refunds::remaining_refundable(payment.total, &refunds))
    }

    /// Payments parked in PENDING_APPROVAL awaiting settlement
    pub fn awaiting_settlement(&self) -> Result<Vec<Payment>> {
        self.storage.payments_by_status(PaymentStatus::PendingApproval)
    }

    /// Pre-terminal payments whose last update is older than `ttl_secs`
    pub fn expirable(&self, ttl_secs: u64) -> Result<Vec<Payment>> {
        let cutoff = Utc::now() - Duration::seconds(ttl_secs as i64);
        let mut stale = Vec::new();
        for status in [PaymentStatus::PendingPayment, PaymentStatus::PendingApproval] {
            for payment in self.storage.payments_by_status(status)? {
                if payment.updated_at < cutoff {
                    stale.push(payment);
                }
            }
        }
        Ok(stale)
    }

    /// Record a gateway message id; returns false when already seen
    pub fn mark_processed(&self, message_id: Uuid) -> Result<bool> {
        self.storage.mark_processed(message_id)
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<crate::storage::StorageStats> {
        self.storage.get_stats()
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

fn authorization_result(status: &PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Approved => "approved",
        PaymentStatus::Rejected => "rejected",
        _ => "pending",
    }
}
