//! Core types for the payment ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money)
//! - Append-only audit records (attempts and events are never rewritten)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// Brazilian Real
    BRL,
    /// Mexican Peso
    MXN,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::BRL => "BRL",
            Currency::MXN => "MXN",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "BRL" => Some(Currency::BRL),
            "MXN" => Some(Currency::MXN),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Payment status
///
/// `PENDING_PAYMENT -> PENDING_APPROVAL -> {APPROVED, REJECTED}`;
/// `APPROVED -> {REFUNDED, CANCELLED}`; any pre-terminal state may expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PaymentStatus {
    /// Created, funds not yet moved
    PendingPayment = 1,
    /// Authorization parked, awaiting asynchronous gateway confirmation
    PendingApproval = 2,
    /// Authorization captured (funds debited)
    Approved = 3,
    /// Authorization declined (terminal)
    Rejected = 4,
    /// Cancelled after approval (terminal)
    Cancelled = 5,
    /// Timed out before reaching a terminal decision (terminal)
    Expired = 6,
    /// Fully refunded (terminal)
    Refunded = 7,
}

impl PaymentStatus {
    /// Check if this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Rejected
                | PaymentStatus::Cancelled
                | PaymentStatus::Expired
                | PaymentStatus::Refunded
        )
    }

    /// Legality table for status transitions
    ///
    /// The retry path after an insufficient-funds decline is the one
    /// documented exception and is gated separately by the ledger; it does
    /// not go through this table.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match self {
            PendingPayment => matches!(next, PendingApproval | Approved | Rejected | Expired),
            PendingApproval => matches!(next, Approved | Rejected | Expired),
            Approved => matches!(next, Refunded | Cancelled | Expired),
            Rejected | Cancelled | Expired | Refunded => false,
        }
    }

    /// Wire representation (SCREAMING_SNAKE_CASE)
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::PendingPayment => "PENDING_PAYMENT",
            PaymentStatus::PendingApproval => "PENDING_APPROVAL",
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Rejected => "REJECTED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Funding instrument kind
///
/// The kind determines two capabilities: whether the instrument carries a
/// local balance (and therefore a conditional debit), and whether its
/// authorization settles synchronously or waits for external confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Stored test card (local balance, asynchronous confirmation)
    TestCard,
    /// Wallet with local balance, settles synchronously
    Wallet,
    /// Bank-linked account (local balance, asynchronous confirmation)
    BankAccount,
    /// External wallet routed to a third-party gateway; no local balance
    ExternalWallet,
}

impl InstrumentKind {
    /// Whether the instrument carries a locally tracked balance
    pub fn has_local_balance(&self) -> bool {
        !matches!(self, InstrumentKind::ExternalWallet)
    }

    /// Whether authorization waits for asynchronous gateway confirmation
    ///
    /// Payments on these instruments park in `PENDING_APPROVAL` until the
    /// settlement sweep (or an inbound gateway command) resolves them.
    pub fn requires_external_confirmation(&self) -> bool {
        matches!(self, InstrumentKind::TestCard | InstrumentKind::BankAccount)
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "test_card" => Some(InstrumentKind::TestCard),
            "wallet" => Some(InstrumentKind::Wallet),
            "bank_account" => Some(InstrumentKind::BankAccount),
            "external_wallet" => Some(InstrumentKind::ExternalWallet),
            _ => None,
        }
    }
}

/// A balance-bearing (or external) payment method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingInstrument {
    /// Instrument ID
    pub id: Uuid,

    /// Instrument kind
    pub kind: InstrumentKind,

    /// Balance currency
    pub currency: Currency,

    /// Available balance; never negative
    pub balance: Decimal,

    /// Active flag; inactive instruments decline all debits
    pub active: bool,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl FundingInstrument {
    /// Create a new active instrument
    pub fn new(kind: InstrumentKind, currency: Currency, balance: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            currency,
            balance,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Draft of a new payment, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDraft {
    /// Paying user
    pub payer_id: Uuid,
    /// Provider being paid
    pub provider_id: Uuid,
    /// Originating coordination request, if any
    pub request_id: Option<Uuid>,
    /// Subtotal amount
    pub subtotal: Decimal,
    /// Taxes amount
    pub taxes: Decimal,
    /// Fees amount
    pub fees: Decimal,
    /// Payment currency
    pub currency: Currency,
    /// Opaque metadata, not interpreted by the ledger
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// The payment aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Payment ID
    pub id: Uuid,

    /// Paying user
    pub payer_id: Uuid,

    /// Provider being paid
    pub provider_id: Uuid,

    /// Originating coordination request, if any
    pub request_id: Option<Uuid>,

    /// Subtotal amount
    pub subtotal: Decimal,

    /// Taxes amount
    pub taxes: Decimal,

    /// Fees amount
    pub fees: Decimal,

    /// Total amount; always `subtotal + taxes + fees`, immutable after creation
    pub total: Decimal,

    /// Payment currency
    pub currency: Currency,

    /// Selected funding instrument, attached before authorization
    pub instrument_id: Option<Uuid>,

    /// Current status
    pub status: PaymentStatus,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,

    /// Set exactly once, on the transition into APPROVED
    pub captured_at: Option<DateTime<Utc>>,

    /// Set on expiry
    pub expired_at: Option<DateTime<Utc>>,

    /// Authorization retries after an insufficient-funds decline
    pub retry_attempts: u32,

    /// Whether the last decline was balance-related
    pub rejected_insufficient_funds: bool,

    /// Opaque metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Payment {
    /// Build a payment from a draft, validating the monetary invariants
    ///
    /// `total` is computed once here and never mutated afterwards.
    pub fn from_draft(draft: PaymentDraft) -> crate::Result<Self> {
        if draft.subtotal <= Decimal::ZERO {
            return Err(crate::Error::Validation(
                "subtotal must be positive".to_string(),
            ));
        }
        if draft.taxes < Decimal::ZERO || draft.fees < Decimal::ZERO {
            return Err(crate::Error::Validation(
                "taxes and fees must not be negative".to_string(),
            ));
        }

        let total = draft.subtotal + draft.taxes + draft.fees;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            payer_id: draft.payer_id,
            provider_id: draft.provider_id,
            request_id: draft.request_id,
            subtotal: draft.subtotal,
            taxes: draft.taxes,
            fees: draft.fees,
            total,
            currency: draft.currency,
            instrument_id: None,
            status: PaymentStatus::PendingPayment,
            created_at: now,
            updated_at: now,
            captured_at: None,
            expired_at: None,
            retry_attempts: 0,
            rejected_insufficient_funds: false,
            metadata: draft.metadata,
        })
    }

    /// Apply a status transition, enforcing the legality table
    ///
    /// Updates `updated_at`, stamps `captured_at` exactly once on the
    /// transition into APPROVED and `expired_at` on expiry. Performs no
    /// mutation when the transition is illegal.
    pub fn transition(&mut self, next: PaymentStatus, now: DateTime<Utc>) -> crate::Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(crate::Error::InvalidStateTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = now;

        if next == PaymentStatus::Approved && self.captured_at.is_none() {
            self.captured_at = Some(now);
        }
        if next == PaymentStatus::Expired {
            self.expired_at = Some(now);
        }

        Ok(())
    }

    /// Check if payment is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Authorization attempt status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    /// Attempt in flight (asynchronous confirmation pending)
    Processing,
    /// Authorization approved (terminal)
    Approved,
    /// Authorization declined (terminal)
    Rejected,
}

impl AttemptStatus {
    /// Terminal attempt outcomes get `completed_at` stamped
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Approved | AttemptStatus::Rejected)
    }
}

/// One authorization attempt recorded against a payment
///
/// Created once per authorization try; never mutated except to fill
/// `completed_at` and the terminal fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Attempt ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Payment this attempt belongs to
    pub payment_id: Uuid,

    /// Sequential attempt number, 1-based, strictly increasing per payment
    pub number: u32,

    /// Resulting status
    pub status: AttemptStatus,

    /// Processor response code
    pub response_code: Option<String>,

    /// Gateway transaction code
    pub gateway_code: Option<String>,

    /// Failure reason (e.g. `insufficient_funds`)
    pub failure_reason: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Set only on terminal outcomes
    pub completed_at: Option<DateTime<Utc>>,
}

impl Attempt {
    /// Record a new attempt with the given sequential number
    pub fn new(payment_id: Uuid, number: u32, status: AttemptStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            payment_id,
            number,
            status,
            response_code: None,
            gateway_code: None,
            failure_reason: None,
            created_at: now,
            completed_at: status.is_terminal().then_some(now),
        }
    }

    /// Set the failure reason
    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    /// Set the gateway transaction code
    pub fn with_gateway_code(mut self, code: impl Into<String>) -> Self {
        self.gateway_code = Some(code.into());
        self
    }

    /// Drive the attempt to a terminal outcome, stamping `completed_at`
    pub fn complete(&mut self, status: AttemptStatus, failure_reason: Option<String>) {
        self.status = status;
        if failure_reason.is_some() {
            self.failure_reason = failure_reason;
        }
        if status.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }
}

/// Domain event type in a payment's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Payment record created
    PaymentCreated,
    /// Funding instrument attached
    InstrumentSelected,
    /// Authorization started (asynchronous leg parked)
    AuthorizationStarted,
    /// Conditional debit applied
    AuthorizationSucceeded,
    /// Conditional debit declined
    AuthorizationFailed,
    /// Retry requested after insufficient-funds decline
    RetryRequested,
    /// Payment approved
    PaymentApproved,
    /// Payment rejected
    PaymentRejected,
    /// Payment cancelled
    PaymentCancelled,
    /// Payment expired
    PaymentExpired,
    /// Payment fully refunded
    PaymentRefunded,
    /// Refund requested
    RefundRequested,
    /// Refund declined by review
    RefundDeclined,
    /// Refund credited back to the instrument
    RefundCompleted,
}

impl EventType {
    /// The event type that corresponds to a transition into `status`
    pub fn for_status(status: PaymentStatus) -> EventType {
        match status {
            PaymentStatus::PendingPayment => EventType::PaymentCreated,
            PaymentStatus::PendingApproval => EventType::AuthorizationStarted,
            PaymentStatus::Approved => EventType::PaymentApproved,
            PaymentStatus::Rejected => EventType::PaymentRejected,
            PaymentStatus::Cancelled => EventType::PaymentCancelled,
            PaymentStatus::Expired => EventType::PaymentExpired,
            PaymentStatus::Refunded => EventType::PaymentRefunded,
        }
    }
}

/// Who produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventActor {
    /// The ledger itself
    System,
    /// Inbound coordination gateway command
    Gateway,
    /// The settlement sweep standing in for the bank
    BankSimulator,
    /// End user action
    User,
}

/// One immutable fact in a payment's timeline
///
/// Append-only; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Event ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Payment this event belongs to
    pub payment_id: Uuid,

    /// Type of event
    pub event_type: EventType,

    /// Event payload
    #[serde(default)]
    pub payload: HashMap<String, String>,

    /// Who produced the event
    pub actor: EventActor,

    /// Event timestamp
    pub created_at: DateTime<Utc>,
}

impl PaymentEvent {
    /// Create a new event
    pub fn new(payment_id: Uuid, event_type: EventType, actor: EventActor) -> Self {
        Self {
            id: Uuid::now_v7(),
            payment_id,
            event_type,
            payload: HashMap::new(),
            actor,
            created_at: Utc::now(),
        }
    }

    /// Add a payload entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Refund status
///
/// `Partial` and `Total` are the completed states: `Total` when the
/// completion brought the remaining refundable amount to exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    /// Requested, not yet reviewed
    Pending,
    /// Reviewed and approved, credit not yet executed
    Approved,
    /// Declined by review
    Declined,
    /// Completed; payment not yet fully refunded
    Partial,
    /// Completed; payment fully refunded
    Total,
    /// Credit leg failed
    Failed,
}

impl RefundStatus {
    /// Whether this refund counts against the payment's refundable total
    ///
    /// Declined and failed refunds release their reservation.
    pub fn counts_against_total(&self) -> bool {
        matches!(
            self,
            RefundStatus::Pending
                | RefundStatus::Approved
                | RefundStatus::Partial
                | RefundStatus::Total
        )
    }

    /// Whether the credit leg has been executed
    pub fn is_completed(&self) -> bool {
        matches!(self, RefundStatus::Partial | RefundStatus::Total)
    }
}

/// A refund against a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    /// Refund ID
    pub id: Uuid,

    /// Payment being refunded
    pub payment_id: Uuid,

    /// Requested amount
    pub amount: Decimal,

    /// Free-form reason
    pub reason: String,

    /// Current status
    pub status: RefundStatus,

    /// Gateway-side refund reference
    pub gateway_refund_id: Option<String>,

    /// Requesting user
    pub requested_by: Uuid,

    /// Reviewer, when reviewed
    pub reviewed_by: Option<Uuid>,

    /// Review timestamp
    pub reviewed_at: Option<DateTime<Utc>>,

    /// Review decision message
    pub decision_message: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Refund {
    /// Create a pending refund request
    pub fn new(payment_id: Uuid, amount: Decimal, reason: String, requested_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payment_id,
            amount,
            reason,
            status: RefundStatus::Pending,
            gateway_refund_id: None,
            requested_by,
            reviewed_by: None,
            reviewed_at: None,
            decision_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a review decision
    pub fn review(&mut self, status: RefundStatus, reviewer: Uuid, message: Option<String>) {
        let now = Utc::now();
        self.status = status;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(now);
        self.decision_message = message;
        self.updated_at = now;
    }
}

/// Inbound gateway command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayCommand {
    /// Approve a pending authorization
    Approve,
    /// Reject a pending authorization
    Reject,
    /// Cancel an approved payment
    Cancel,
    /// Capture a pending authorization (alias for approve-and-capture)
    Capture,
}

/// Timeline read order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Chronological narrative, oldest first
    Ascending,
    /// Newest first
    Descending,
}

/// Status update published to the coordination gateway after every transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Payment ID
    pub payment_id: Uuid,
    /// Originating coordination request, if any
    pub request_id: Option<Uuid>,
    /// Status before the transition
    pub old_status: PaymentStatus,
    /// Status after the transition
    pub new_status: PaymentStatus,
    /// Transition reason, when one exists
    pub reason: Option<String>,
    /// Payment total
    pub amount_total: Decimal,
    /// Payment currency
    pub currency: Currency,
    /// Gateway transaction reference from the latest attempt
    pub gateway_txn_id: Option<String>,
    /// Transition timestamp
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> PaymentDraft {
        PaymentDraft {
            payer_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            request_id: None,
            subtotal: dec!(100.00),
            taxes: dec!(10.00),
            fees: dec!(5.00),
            currency: Currency::USD,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        let payment = Payment::from_draft(draft()).unwrap();
        assert_eq!(payment.total, dec!(115.00));
        assert_eq!(payment.status, PaymentStatus::PendingPayment);
        assert_eq!(payment.total, payment.subtotal + payment.taxes + payment.fees);
    }

    #[test]
    fn test_rejects_non_positive_subtotal() {
        let mut d = draft();
        d.subtotal = Decimal::ZERO;
        assert!(Payment::from_draft(d).is_err());
    }

    #[test]
    fn test_rejects_negative_fees() {
        let mut d = draft();
        d.fees = dec!(-1.00);
        assert!(Payment::from_draft(d).is_err());
    }

    #[test]
    fn test_transition_table() {
        use PaymentStatus::*;

        assert!(PendingPayment.can_transition_to(PendingApproval));
        assert!(PendingPayment.can_transition_to(Approved));
        assert!(PendingPayment.can_transition_to(Rejected));
        assert!(PendingApproval.can_transition_to(Approved));
        assert!(PendingApproval.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Refunded));
        assert!(Approved.can_transition_to(Cancelled));

        // No regressions out of terminal states
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Cancelled.can_transition_to(Approved));
        assert!(!Refunded.can_transition_to(Approved));
        assert!(!Expired.can_transition_to(PendingPayment));

        // No skipping back
        assert!(!Approved.can_transition_to(PendingPayment));
        assert!(!PendingApproval.can_transition_to(PendingPayment));
    }

    #[test]
    fn test_transition_stamps_captured_at_once() {
        let mut payment = Payment::from_draft(draft()).unwrap();
        assert!(payment.captured_at.is_none());

        payment.transition(PaymentStatus::Approved, Utc::now()).unwrap();
        let captured = payment.captured_at.expect("captured_at set on approval");

        payment.transition(PaymentStatus::Refunded, Utc::now()).unwrap();
        assert_eq!(payment.captured_at, Some(captured));
    }

    #[test]
    fn test_illegal_transition_mutates_nothing() {
        let mut payment = Payment::from_draft(draft()).unwrap();
        payment.transition(PaymentStatus::Rejected, Utc::now()).unwrap();
        let before = payment.updated_at;

        let err = payment.transition(PaymentStatus::Approved, Utc::now());
        assert!(matches!(
            err,
            Err(crate::Error::InvalidStateTransition { .. })
        ));
        assert_eq!(payment.status, PaymentStatus::Rejected);
        assert_eq!(payment.updated_at, before);
    }

    #[test]
    fn test_instrument_capabilities() {
        assert!(InstrumentKind::TestCard.has_local_balance());
        assert!(InstrumentKind::TestCard.requires_external_confirmation());
        assert!(InstrumentKind::Wallet.has_local_balance());
        assert!(!InstrumentKind::Wallet.requires_external_confirmation());
        assert!(!InstrumentKind::ExternalWallet.has_local_balance());
        assert!(!InstrumentKind::ExternalWallet.requires_external_confirmation());
        assert!(InstrumentKind::BankAccount.requires_external_confirmation());
    }

    #[test]
    fn test_attempt_completed_at_only_on_terminal() {
        let attempt = Attempt::new(Uuid::new_v4(), 1, AttemptStatus::Processing);
        assert!(attempt.completed_at.is_none());

        let mut attempt = attempt;
        attempt.complete(AttemptStatus::Approved, None);
        assert!(attempt.completed_at.is_some());

        let rejected = Attempt::new(Uuid::new_v4(), 1, AttemptStatus::Rejected)
            .with_failure_reason("insufficient_funds");
        assert!(rejected.completed_at.is_some());
        assert_eq!(rejected.failure_reason.as_deref(), Some("insufficient_funds"));
    }

    #[test]
    fn test_refund_accounting_states() {
        assert!(RefundStatus::Pending.counts_against_total());
        assert!(RefundStatus::Approved.counts_against_total());
        assert!(RefundStatus::Partial.counts_against_total());
        assert!(RefundStatus::Total.counts_against_total());
        assert!(!RefundStatus::Declined.counts_against_total());
        assert!(!RefundStatus::Failed.counts_against_total());

        assert!(RefundStatus::Partial.is_completed());
        assert!(RefundStatus::Total.is_completed());
        assert!(!RefundStatus::Pending.is_completed());
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("USD"), Some(Currency::USD));
        assert_eq!(Currency::parse("BRL"), Some(Currency::BRL));
        assert_eq!(Currency::parse("XYZ"), None);
    }

    #[test]
    fn test_event_type_for_status() {
        assert_eq!(
            EventType::for_status(PaymentStatus::Approved),
            EventType::PaymentApproved
        );
        assert_eq!(
            EventType::for_status(PaymentStatus::PendingApproval),
            EventType::AuthorizationStarted
        );
        assert_eq!(
            EventType::for_status(PaymentStatus::Refunded),
            EventType::PaymentRefunded
        );
    }
}
