//! Actor-based concurrency for the payment ledger
//!
//! All mutation flows through a single writer task:
//! - One logical writer eliminates read-modify-write races on instrument
//!   balances and attempt numbering
//! - Each command commits exactly one atomic `WriteBatch`
//! - Async message passing with backpressure (bounded mailbox)
//!
//! Because a full authorization (state gate + conditional debit + attempt +
//! events + status write) is one command, two concurrent `authorize` calls
//! for the same payment serialize in the mailbox and the loser fails the
//! state gate instead of producing a second debit.

use crate::{
    config::PaymentConfig,
    funds::{self, DebitOutcome},
    refunds,
    types::{
        Attempt, AttemptStatus, EventActor, EventType, FundingInstrument, Payment, PaymentDraft,
        PaymentEvent, PaymentStatus, Refund, RefundStatus,
    },
    Error, Result, Storage,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Result of a ledger operation that may have changed payment status
#[derive(Debug, Clone)]
pub struct Transition {
    /// The payment after the operation
    pub payment: Payment,
    /// Status before the operation
    pub previous: PaymentStatus,
    /// Human-readable reason, when one exists
    pub reason: Option<String>,
    /// Gateway transaction reference produced by the operation, if any
    pub gateway_txn_id: Option<String>,
    /// Timeline events appended by the operation
    pub events: Vec<PaymentEvent>,
}

impl Transition {
    /// Whether the payment status actually changed
    pub fn changed(&self) -> bool {
        self.previous != self.payment.status
    }
}

/// Result of completing a refund
#[derive(Debug, Clone)]
pub struct RefundCompletion {
    /// The completed refund
    pub refund: Refund,
    /// Payment transition to REFUNDED, when the completion exhausted the total
    pub transition: Option<Transition>,
}

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Create a payment from a validated draft
    CreatePayment {
        /// Payment draft
        draft: PaymentDraft,
        /// Response channel
        respond: oneshot::Sender<Result<Transition>>,
    },

    /// Register a funding instrument
    CreateInstrument {
        /// The instrument to persist
        instrument: FundingInstrument,
        /// Response channel
        respond: oneshot::Sender<Result<FundingInstrument>>,
    },

    /// Attach a funding instrument to a pending payment
    SelectInstrument {
        /// Payment to attach to
        payment_id: Uuid,
        /// Instrument to attach
        instrument_id: Uuid,
        /// Response channel
        respond: oneshot::Sender<Result<Transition>>,
    },

    /// Run the authorization path for a payment
    Authorize {
        /// Payment to authorize
        payment_id: Uuid,
        /// Who initiated the authorization
        actor: EventActor,
        /// Whether this is a retry after an insufficient-funds decline
        retry: bool,
        /// Response channel
        respond: oneshot::Sender<Result<Transition>>,
    },

    /// Resolve a payment parked in PENDING_APPROVAL
    FinalizeAuthorization {
        /// Payment to resolve
        payment_id: Uuid,
        /// Approve (runs the conditional debit) or reject
        approve: bool,
        /// Reason recorded on the outcome
        reason: Option<String>,
        /// Who resolved it
        actor: EventActor,
        /// Response channel
        respond: oneshot::Sender<Result<Transition>>,
    },

    /// Apply a direct status transition (cancel, expire)
    ApplyStatus {
        /// Payment to transition
        payment_id: Uuid,
        /// Target status
        target: PaymentStatus,
        /// Reason recorded on the event and notification
        reason: Option<String>,
        /// Who requested the transition
        actor: EventActor,
        /// Response channel
        respond: oneshot::Sender<Result<Transition>>,
    },

    /// Credit funds onto an instrument (top-up)
    TopUpInstrument {
        /// Instrument to credit
        instrument_id: Uuid,
        /// Amount to add
        amount: Decimal,
        /// Response channel
        respond: oneshot::Sender<Result<FundingInstrument>>,
    },

    /// Create a pending refund (no funds move)
    CreateRefund {
        /// Payment to refund
        payment_id: Uuid,
        /// Requested amount
        amount: Decimal,
        /// Free-form reason
        reason: String,
        /// Requesting user
        requested_by: Uuid,
        /// Response channel
        respond: oneshot::Sender<Result<Refund>>,
    },

    /// Review a pending refund
    ReviewRefund {
        /// Refund under review
        refund_id: Uuid,
        /// Approve or decline
        approve: bool,
        /// Reviewer
        reviewer: Uuid,
        /// Decision message
        message: Option<String>,
        /// Response channel
        respond: oneshot::Sender<Result<Refund>>,
    },

    /// Complete a refund: credit the instrument, maybe close out the payment
    CompleteRefund {
        /// Refund to complete
        refund_id: Uuid,
        /// Who completed it
        actor: EventActor,
        /// Response channel
        respond: oneshot::Sender<Result<RefundCompletion>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Payment policy knobs
    policy: PaymentConfig,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        policy: PaymentConfig,
    ) -> Self {
        Self {
            storage,
            mailbox,
            policy,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                other => self.handle_message(other),
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::CreatePayment { draft, respond } => {
                let _ = respond.send(self.create_payment(draft));
            }
            LedgerMessage::CreateInstrument { instrument, respond } => {
                let _ = respond.send(self.create_instrument(instrument));
            }
            LedgerMessage::SelectInstrument {
                payment_id,
                instrument_id,
                respond,
            } => {
                let _ = respond.send(self.select_instrument(payment_id, instrument_id));
            }
            LedgerMessage::Authorize {
                payment_id,
                actor,
                retry,
                respond,
            } => {
                let _ = respond.send(self.authorize(payment_id, actor, retry));
            }
            LedgerMessage::FinalizeAuthorization {
                payment_id,
                approve,
                reason,
                actor,
                respond,
            } => {
                let _ = respond.send(self.finalize_authorization(payment_id, approve, reason, actor));
            }
            LedgerMessage::ApplyStatus {
                payment_id,
                target,
                reason,
                actor,
                respond,
            } => {
                let _ = respond.send(self.apply_status(payment_id, target, reason, actor));
            }
            LedgerMessage::TopUpInstrument {
                instrument_id,
                amount,
                respond,
            } => {
                let _ = respond.send(self.top_up_instrument(instrument_id, amount));
            }
            LedgerMessage::CreateRefund {
                payment_id,
                amount,
                reason,
                requested_by,
                respond,
            } => {
                let _ = respond.send(self.create_refund(payment_id, amount, reason, requested_by));
            }
            LedgerMessage::ReviewRefund {
                refund_id,
                approve,
                reviewer,
                message,
                respond,
            } => {
                let _ = respond.send(self.review_refund(refund_id, approve, reviewer, message));
            }
            LedgerMessage::CompleteRefund {
                refund_id,
                actor,
                respond,
            } => {
                let _ = respond.send(self.complete_refund(refund_id, actor));
            }
            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    fn create_payment(&self, draft: PaymentDraft) -> Result<Transition> {
        let payment = Payment::from_draft(draft)?;

        let event = PaymentEvent::new(payment.id, EventType::PaymentCreated, EventActor::System)
            .with("subtotal", payment.subtotal.to_string())
            .with("taxes", payment.taxes.to_string())
            .with("fees", payment.fees.to_string())
            .with("total", payment.total.to_string())
            .with("currency", payment.currency.code());

        let events = vec![event];
        self.storage.create_payment_atomic(&payment, &events)?;

        tracing::info!(
            payment_id = %payment.id,
            total = %payment.total,
            currency = %payment.currency,
            "Payment created"
        );

        Ok(Transition {
            previous: payment.status,
            payment,
            reason: None,
            gateway_txn_id: None,
            events,
        })
    }

    fn create_instrument(&self, instrument: FundingInstrument) -> Result<FundingInstrument> {
        if instrument.balance < Decimal::ZERO {
            return Err(Error::Validation(
                "instrument balance must not be negative".to_string(),
            ));
        }
        self.storage.put_instrument(&instrument)?;
        tracing::info!(
            instrument_id = %instrument.id,
            kind = ?instrument.kind,
            "Funding instrument registered"
        );
        Ok(instrument)
    }

    fn select_instrument(&self, payment_id: Uuid, instrument_id: Uuid) -> Result<Transition> {
        let mut payment = self.storage.get_payment(payment_id)?;

        if payment.status != PaymentStatus::PendingPayment {
            return Err(Error::Validation(format!(
                "funding instrument can only be selected in PENDING_PAYMENT (current: {})",
                payment.status
            )));
        }

        let instrument = self.storage.get_instrument(instrument_id)?;
        if !instrument.active {
            return Err(Error::Validation("funding instrument is inactive".to_string()));
        }
        if instrument.currency != payment.currency {
            return Err(Error::Validation(format!(
                "instrument currency {} does not match payment currency {}",
                instrument.currency, payment.currency
            )));
        }

        let previous = payment.status;
        payment.instrument_id = Some(instrument_id);
        payment.updated_at = Utc::now();

        let events = vec![
            PaymentEvent::new(payment.id, EventType::InstrumentSelected, EventActor::User)
                .with("instrument_id", instrument_id.to_string())
                .with("kind", format!("{:?}", instrument.kind)),
        ];

        self.storage.update_payment_atomic(&payment, previous, &events)?;

        Ok(Transition {
            previous,
            payment,
            reason: None,
            gateway_txn_id: None,
            events,
        })
    }

    fn authorize(&self, payment_id: Uuid, actor: EventActor, retry: bool) -> Result<Transition> {
        let mut payment = self.storage.get_payment(payment_id)?;
        let previous = payment.status;
        let mut events = Vec::new();

        if retry {
            if payment.status != PaymentStatus::Rejected || !payment.rejected_insufficient_funds {
                return Err(Error::Validation(
                    "retry is only permitted after an insufficient-funds decline".to_string(),
                ));
            }
            if payment.retry_attempts >= self.policy.max_retry_attempts {
                return Err(Error::RetryLimitExceeded(payment_id.to_string()));
            }

            payment.retry_attempts += 1;
            // Documented exception to the transition table: a retry re-opens
            // the rejected payment for one more authorization pass.
            payment.status = PaymentStatus::PendingPayment;
            payment.updated_at = Utc::now();

            events.push(
                PaymentEvent::new(payment.id, EventType::RetryRequested, actor)
                    .with("retry_attempt", payment.retry_attempts.to_string()),
            );
        } else if payment.status != PaymentStatus::PendingPayment {
            return Err(Error::InvalidStateTransition {
                from: payment.status,
                to: PaymentStatus::Approved,
            });
        }

        let instrument_id = payment.instrument_id.ok_or_else(|| {
            Error::Validation("payment has no funding instrument attached".to_string())
        })?;
        let instrument = self.storage.get_instrument(instrument_id)?;

        if instrument.kind.requires_external_confirmation() {
            // Park the authorization; the settlement sweep or a gateway
            // command drives the terminal leg.
            let number = self.storage.attempt_count(payment.id)? + 1;
            let attempt = Attempt::new(payment.id, number, AttemptStatus::Processing);

            events.push(
                PaymentEvent::new(payment.id, EventType::AuthorizationStarted, actor)
                    .with("attempt_number", number.to_string())
                    .with("instrument_id", instrument_id.to_string()),
            );

            payment.transition(PaymentStatus::PendingApproval, Utc::now())?;
            self.storage
                .authorize_atomic(&payment, previous, None, &attempt, &events)?;

            tracing::info!(
                payment_id = %payment.id,
                attempt = number,
                "Authorization parked awaiting external confirmation"
            );

            return Ok(Transition {
                previous,
                payment,
                reason: None,
                gateway_txn_id: None,
                events,
            });
        }

        self.settle_debit(payment, previous, instrument, actor, events, None)
    }

    fn finalize_authorization(
        &self,
        payment_id: Uuid,
        approve: bool,
        reason: Option<String>,
        actor: EventActor,
    ) -> Result<Transition> {
        let mut payment = self.storage.get_payment(payment_id)?;
        let previous = payment.status;
        let target = if approve {
            PaymentStatus::Approved
        } else {
            PaymentStatus::Rejected
        };

        // Re-applying an already-applied outcome is a no-op, not an error
        if payment.status == target {
            return Ok(Transition {
                previous,
                payment,
                reason,
                gateway_txn_id: None,
                events: Vec::new(),
            });
        }

        if payment.status != PaymentStatus::PendingApproval {
            return Err(Error::InvalidStateTransition {
                from: payment.status,
                to: target,
            });
        }

        let pending_attempt = match self.storage.latest_attempt(payment.id)? {
            Some(attempt) if attempt.status == AttemptStatus::Processing => Some(attempt),
            _ => None,
        };

        if approve {
            let instrument_id = payment.instrument_id.ok_or_else(|| {
                Error::Validation("payment has no funding instrument attached".to_string())
            })?;
            let instrument = self.storage.get_instrument(instrument_id)?;
            return self.settle_debit(
                payment,
                previous,
                instrument,
                actor,
                Vec::new(),
                pending_attempt,
            );
        }

        // Gateway (or simulated bank) rejection: no funds were moved, so the
        // attempt just completes as rejected.
        let reason_str = reason.unwrap_or_else(|| "gateway_declined".to_string());
        let mut attempt = match pending_attempt {
            Some(attempt) => attempt,
            None => Attempt::new(
                payment.id,
                self.storage.attempt_count(payment.id)? + 1,
                AttemptStatus::Processing,
            ),
        };
        attempt.complete(AttemptStatus::Rejected, Some(reason_str.clone()));
        attempt.response_code = Some("05".to_string());

        let events = vec![
            PaymentEvent::new(payment.id, EventType::AuthorizationFailed, actor)
                .with("attempt_number", attempt.number.to_string())
                .with("reason", reason_str.clone()),
            PaymentEvent::new(payment.id, EventType::PaymentRejected, actor)
                .with("old_status", previous.as_str())
                .with("reason", reason_str.clone()),
        ];

        payment.transition(PaymentStatus::Rejected, Utc::now())?;
        self.storage
            .authorize_atomic(&payment, previous, None, &attempt, &events)?;

        tracing::info!(
            payment_id = %payment.id,
            reason = %reason_str,
            "Pending authorization rejected"
        );

        Ok(Transition {
            previous,
            payment,
            reason: Some(reason_str),
            gateway_txn_id: None,
            events,
        })
    }

    /// Execute the conditional debit and commit the full outcome atomically
    ///
    /// Shared by synchronous authorization and the approval leg of
    /// `finalize_authorization`. Declines resolve into a REJECTED transition
    /// with the attempt and events recorded; they are never surfaced as
    /// errors past this point.
    fn settle_debit(
        &self,
        mut payment: Payment,
        previous: PaymentStatus,
        instrument: FundingInstrument,
        actor: EventActor,
        mut events: Vec<PaymentEvent>,
        pending_attempt: Option<Attempt>,
    ) -> Result<Transition> {
        let plan = funds::plan_debit(&instrument, &payment);

        let mut attempt = match pending_attempt {
            Some(attempt) => attempt,
            None => Attempt::new(
                payment.id,
                self.storage.attempt_count(payment.id)? + 1,
                AttemptStatus::Processing,
            ),
        };

        match plan.outcome {
            DebitOutcome::Applied => {
                let gateway_txn_id = format!("AUTH-{}", Uuid::new_v4());
                attempt.complete(AttemptStatus::Approved, None);
                attempt.response_code = Some("00".to_string());
                attempt.gateway_code = Some(gateway_txn_id.clone());

                events.push(
                    PaymentEvent::new(payment.id, EventType::AuthorizationSucceeded, actor)
                        .with("attempt_number", attempt.number.to_string())
                        .with("amount", payment.total.to_string())
                        .with("rows_affected", plan.rows_affected().to_string()),
                );
                events.push(
                    PaymentEvent::new(payment.id, EventType::PaymentApproved, actor)
                        .with("old_status", previous.as_str())
                        .with("amount", payment.total.to_string())
                        .with("currency", payment.currency.code()),
                );

                payment.rejected_insufficient_funds = false;
                payment.transition(PaymentStatus::Approved, Utc::now())?;
                self.storage.authorize_atomic(
                    &payment,
                    previous,
                    plan.updated_instrument.as_ref(),
                    &attempt,
                    &events,
                )?;

                tracing::info!(
                    payment_id = %payment.id,
                    attempt = attempt.number,
                    amount = %payment.total,
                    "Authorization approved"
                );

                Ok(Transition {
                    previous,
                    payment,
                    reason: None,
                    gateway_txn_id: Some(gateway_txn_id),
                    events,
                })
            }
            DebitOutcome::Declined(decline) => {
                let reason = decline.as_str().to_string();
                attempt.complete(AttemptStatus::Rejected, Some(reason.clone()));
                attempt.response_code = Some(if decline.is_balance_related() {
                    "51".to_string()
                } else {
                    "05".to_string()
                });

                events.push(
                    PaymentEvent::new(payment.id, EventType::AuthorizationFailed, actor)
                        .with("attempt_number", attempt.number.to_string())
                        .with("reason", reason.clone()),
                );
                events.push(
                    PaymentEvent::new(payment.id, EventType::PaymentRejected, actor)
                        .with("old_status", previous.as_str())
                        .with("reason", reason.clone()),
                );

                payment.rejected_insufficient_funds = decline.is_balance_related();
                payment.transition(PaymentStatus::Rejected, Utc::now())?;
                self.storage
                    .authorize_atomic(&payment, previous, None, &attempt, &events)?;

                tracing::warn!(
                    payment_id = %payment.id,
                    attempt = attempt.number,
                    reason = %reason,
                    "Authorization declined"
                );

                Ok(Transition {
                    previous,
                    payment,
                    reason: Some(reason),
                    gateway_txn_id: None,
                    events,
                })
            }
        }
    }

    fn apply_status(
        &self,
        payment_id: Uuid,
        target: PaymentStatus,
        reason: Option<String>,
        actor: EventActor,
    ) -> Result<Transition> {
        let mut payment = self.storage.get_payment(payment_id)?;
        let previous = payment.status;

        // Idempotent re-application
        if payment.status == target {
            return Ok(Transition {
                previous,
                payment,
                reason,
                gateway_txn_id: None,
                events: Vec::new(),
            });
        }

        payment.transition(target, Utc::now())?;

        let mut event = PaymentEvent::new(payment.id, EventType::for_status(target), actor)
            .with("old_status", previous.as_str())
            .with("new_status", target.as_str());
        if let Some(ref reason) = reason {
            event = event.with("reason", reason.clone());
        }
        let events = vec![event];

        self.storage.update_payment_atomic(&payment, previous, &events)?;

        tracing::info!(
            payment_id = %payment.id,
            from = %previous,
            to = %target,
            "Payment status transition"
        );

        Ok(Transition {
            previous,
            payment,
            reason,
            gateway_txn_id: None,
            events,
        })
    }

    fn top_up_instrument(&self, instrument_id: Uuid, amount: Decimal) -> Result<FundingInstrument> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(
                "top-up amount must be positive".to_string(),
            ));
        }

        let instrument = self.storage.get_instrument(instrument_id)?;
        let updated = funds::plan_credit(&instrument, amount).ok_or_else(|| {
            Error::Validation("instrument does not carry a local balance".to_string())
        })?;

        self.storage.put_instrument(&updated)?;

        tracing::info!(
            instrument_id = %instrument_id,
            amount = %amount,
            balance = %updated.balance,
            "Instrument topped up"
        );

        Ok(updated)
    }

    fn create_refund(
        &self,
        payment_id: Uuid,
        amount: Decimal,
        reason: String,
        requested_by: Uuid,
    ) -> Result<Refund> {
        let payment = self.storage.get_payment(payment_id)?;
        let existing = self.storage.refunds_for(payment_id)?;

        refunds::validate_request(&payment, &existing, amount)?;

        let refund = Refund::new(payment_id, amount, reason, requested_by);
        let events = vec![
            PaymentEvent::new(payment_id, EventType::RefundRequested, EventActor::User)
                .with("refund_id", refund.id.to_string())
                .with("amount", amount.to_string()),
        ];

        self.storage.refund_atomic(&refund, None, None, &events)?;

        tracing::info!(
            payment_id = %payment_id,
            refund_id = %refund.id,
            amount = %amount,
            "Refund requested"
        );

        Ok(refund)
    }

    fn review_refund(
        &self,
        refund_id: Uuid,
        approve: bool,
        reviewer: Uuid,
        message: Option<String>,
    ) -> Result<Refund> {
        let mut refund = self.storage.get_refund(refund_id)?;

        if refund.status != RefundStatus::Pending {
            return Err(Error::Validation(format!(
                "refund {} has already been reviewed",
                refund_id
            )));
        }

        let status = if approve {
            RefundStatus::Approved
        } else {
            RefundStatus::Declined
        };
        refund.review(status, reviewer, message);

        let events = if approve {
            Vec::new()
        } else {
            vec![
                PaymentEvent::new(refund.payment_id, EventType::RefundDeclined, EventActor::User)
                    .with("refund_id", refund.id.to_string())
                    .with("amount", refund.amount.to_string()),
            ]
        };

        self.storage.refund_atomic(&refund, None, None, &events)?;

        Ok(refund)
    }

    fn complete_refund(&self, refund_id: Uuid, actor: EventActor) -> Result<RefundCompletion> {
        let mut refund = self.storage.get_refund(refund_id)?;

        if !matches!(refund.status, RefundStatus::Pending | RefundStatus::Approved) {
            return Err(Error::Validation(format!(
                "refund {} is not completable from status {:?}",
                refund_id, refund.status
            )));
        }

        let mut payment = self.storage.get_payment(refund.payment_id)?;
        let instrument_id = payment.instrument_id.ok_or_else(|| {
            Error::Validation("payment has no funding instrument attached".to_string())
        })?;
        let instrument = self.storage.get_instrument(instrument_id)?;
        let credited = funds::plan_credit(&instrument, refund.amount);

        // The refund already reserves its amount, so the remaining total is
        // unchanged by the completion itself; zero remaining means this
        // completion exhausts the authorized total.
        let all_refunds = self.storage.refunds_for(refund.payment_id)?;
        let remaining = refunds::remaining_refundable(payment.total, &all_refunds);
        let exhausted = remaining == Decimal::ZERO;

        refund.status = if exhausted {
            RefundStatus::Total
        } else {
            RefundStatus::Partial
        };
        refund.gateway_refund_id = Some(format!("REF-{}", Uuid::new_v4()));
        refund.updated_at = Utc::now();

        let mut events = vec![
            PaymentEvent::new(refund.payment_id, EventType::RefundCompleted, actor)
                .with("refund_id", refund.id.to_string())
                .with("amount", refund.amount.to_string())
                .with("remaining_refundable", remaining.to_string()),
        ];

        let transition = if exhausted && payment.status == PaymentStatus::Approved {
            let previous = payment.status;
            payment.transition(PaymentStatus::Refunded, Utc::now())?;
            events.push(
                PaymentEvent::new(payment.id, EventType::PaymentRefunded, actor)
                    .with("old_status", previous.as_str())
                    .with("amount", payment.total.to_string()),
            );
            Some((previous, payment.clone()))
        } else {
            None
        };

        self.storage.refund_atomic(
            &refund,
            transition.as_ref().map(|(prev, p)| (p, *prev)),
            credited.as_ref(),
            &events,
        )?;

        tracing::info!(
            payment_id = %refund.payment_id,
            refund_id = %refund.id,
            amount = %refund.amount,
            remaining = %remaining,
            "Refund completed"
        );

        Ok(RefundCompletion {
            refund,
            transition: transition.map(|(previous, payment)| Transition {
                previous,
                payment,
                reason: Some("fully_refunded".to_string()),
                gateway_txn_id: None,
                events: events.clone(),
            }),
        })
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Create a payment
    pub async fn create_payment(&self, draft: PaymentDraft) -> Result<Transition> {
        self.request(|respond| LedgerMessage::CreatePayment { draft, respond })
            .await
    }

    /// Register a funding instrument
    pub async fn create_instrument(&self, instrument: FundingInstrument) -> Result<FundingInstrument> {
        self.request(|respond| LedgerMessage::CreateInstrument { instrument, respond })
            .await
    }

    /// Attach a funding instrument
    pub async fn select_instrument(
        &self,
        payment_id: Uuid,
        instrument_id: Uuid,
    ) -> Result<Transition> {
        self.request(|respond| LedgerMessage::SelectInstrument {
            payment_id,
            instrument_id,
            respond,
        })
        .await
    }

    /// Authorize a payment
    pub async fn authorize(
        &self,
        payment_id: Uuid,
        actor: EventActor,
        retry: bool,
    ) -> Result<Transition> {
        self.request(|respond| LedgerMessage::Authorize {
            payment_id,
            actor,
            retry,
            respond,
        })
        .await
    }

    /// Resolve a payment parked in PENDING_APPROVAL
    pub async fn finalize_authorization(
        &self,
        payment_id: Uuid,
        approve: bool,
        reason: Option<String>,
        actor: EventActor,
    ) -> Result<Transition> {
        self.request(|respond| LedgerMessage::FinalizeAuthorization {
            payment_id,
            approve,
            reason,
            actor,
            respond,
        })
        .await
    }

    /// Apply a direct status transition
    pub async fn apply_status(
        &self,
        payment_id: Uuid,
        target: PaymentStatus,
        reason: Option<String>,
        actor: EventActor,
    ) -> Result<Transition> {
        self.request(|respond| LedgerMessage::ApplyStatus {
            payment_id,
            target,
            reason,
            actor,
            respond,
        })
        .await
    }

    /// Credit funds onto an instrument
    pub async fn top_up_instrument(
        &self,
        instrument_id: Uuid,
        amount: Decimal,
    ) -> Result<FundingInstrument> {
        self.request(|respond| LedgerMessage::TopUpInstrument {
            instrument_id,
            amount,
            respond,
        })
        .await
    }

    /// Create a pending refund
    pub async fn create_refund(
        &self,
        payment_id: Uuid,
        amount: Decimal,
        reason: String,
        requested_by: Uuid,
    ) -> Result<Refund> {
        self.request(|respond| LedgerMessage::CreateRefund {
            payment_id,
            amount,
            reason,
            requested_by,
            respond,
        })
        .await
    }

    /// Review a pending refund
    pub async fn review_refund(
        &self,
        refund_id: Uuid,
        approve: bool,
        reviewer: Uuid,
        message: Option<String>,
    ) -> Result<Refund> {
        self.request(|respond| LedgerMessage::ReviewRefund {
            refund_id,
            approve,
            reviewer,
            message,
            respond,
        })
        .await
    }

    /// Complete a refund
    pub async fn complete_refund(
        &self,
        refund_id: Uuid,
        actor: EventActor,
    ) -> Result<RefundCompletion> {
        self.request(|respond| LedgerMessage::CompleteRefund {
            refund_id,
            actor,
            respond,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    storage: Arc<Storage>,
    policy: PaymentConfig,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, rx, policy);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
