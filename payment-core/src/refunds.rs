//! Refund accounting
//!
//! The remaining refundable amount is recomputed from the stored refunds on
//! every request. It is never cached: two refund submissions racing each
//! other must both see the reservations already made, and the single-writer
//! serialization plus this recomputation is what enforces the ceiling.

use crate::types::{Payment, PaymentStatus, Refund};
use crate::{Error, Result};
use rust_decimal::Decimal;

/// Remaining refundable amount for a payment
///
/// `max(0, total - sum(non-declined refund amounts))`. Pending and approved
/// refunds reserve their amount before any funds move, so the ceiling holds
/// under concurrent submissions.
pub fn remaining_refundable(total: Decimal, refunds: &[Refund]) -> Decimal {
    let reserved: Decimal = refunds
        .iter()
        .filter(|r| r.status.counts_against_total())
        .map(|r| r.amount)
        .sum();

    (total - reserved).max(Decimal::ZERO)
}

/// Validate a refund request against the payment state and the ceiling
pub fn validate_request(payment: &Payment, refunds: &[Refund], amount: Decimal) -> Result<()> {
    if !matches!(
        payment.status,
        PaymentStatus::Approved | PaymentStatus::Refunded
    ) {
        return Err(Error::InvalidStateTransition {
            from: payment.status,
            to: PaymentStatus::Refunded,
        });
    }

    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(
            "refund amount must be positive".to_string(),
        ));
    }

    let remaining = remaining_refundable(payment.total, refunds);
    if amount > remaining {
        return Err(Error::InvalidAmount(format!(
            "refund amount {} exceeds remaining refundable {}",
            amount, remaining
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, PaymentDraft, RefundStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn approved_payment() -> Payment {
        let mut payment = Payment::from_draft(PaymentDraft {
            payer_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            request_id: None,
            subtotal: dec!(100.00),
            taxes: dec!(10.00),
            fees: dec!(5.00),
            currency: Currency::USD,
            metadata: HashMap::new(),
        })
        .unwrap();
        payment.transition(PaymentStatus::Approved, Utc::now()).unwrap();
        payment
    }

    fn refund_with_status(payment_id: Uuid, amount: Decimal, status: RefundStatus) -> Refund {
        let mut refund = Refund::new(payment_id, amount, "test".to_string(), Uuid::new_v4());
        refund.status = status;
        refund
    }

    #[test]
    fn test_remaining_with_no_refunds() {
        let payment = approved_payment();
        assert_eq!(remaining_refundable(payment.total, &[]), dec!(115.00));
    }

    #[test]
    fn test_remaining_counts_pending_and_completed() {
        let payment = approved_payment();
        let refunds = vec![
            refund_with_status(payment.id, dec!(40.00), RefundStatus::Partial),
            refund_with_status(payment.id, dec!(20.00), RefundStatus::Pending),
        ];
        assert_eq!(remaining_refundable(payment.total, &refunds), dec!(55.00));
    }

    #[test]
    fn test_remaining_ignores_declined_and_failed() {
        let payment = approved_payment();
        let refunds = vec![
            refund_with_status(payment.id, dec!(40.00), RefundStatus::Declined),
            refund_with_status(payment.id, dec!(40.00), RefundStatus::Failed),
        ];
        assert_eq!(remaining_refundable(payment.total, &refunds), dec!(115.00));
    }

    #[test]
    fn test_remaining_never_negative() {
        let payment = approved_payment();
        let refunds = vec![refund_with_status(
            payment.id,
            dec!(500.00),
            RefundStatus::Total,
        )];
        assert_eq!(remaining_refundable(payment.total, &refunds), Decimal::ZERO);
    }

    #[test]
    fn test_validate_rejects_wrong_payment_state() {
        let mut payment = approved_payment();
        payment.status = PaymentStatus::PendingPayment;
        let err = validate_request(&payment, &[], dec!(10.00)).unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_validate_rejects_excessive_amount() {
        let payment = approved_payment();
        let refunds = vec![refund_with_status(
            payment.id,
            dec!(40.00),
            RefundStatus::Partial,
        )];
        // 115 - 40 = 75 remaining; 80 exceeds it
        let err = validate_request(&payment, &refunds, dec!(80.00)).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        let payment = approved_payment();
        let err = validate_request(&payment, &[], Decimal::ZERO).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn test_validate_accepts_exact_remaining() {
        let payment = approved_payment();
        let refunds = vec![refund_with_status(
            payment.id,
            dec!(40.00),
            RefundStatus::Partial,
        )];
        assert!(validate_request(&payment, &refunds, dec!(75.00)).is_ok());
    }

    #[test]
    fn test_validate_allows_refund_on_partially_refunded_payment() {
        let mut payment = approved_payment();
        payment.status = PaymentStatus::Refunded;
        // Fully refunded payments pass the state gate; the ceiling stops them
        let refunds = vec![refund_with_status(
            payment.id,
            dec!(115.00),
            RefundStatus::Total,
        )];
        let err = validate_request(&payment, &refunds, dec!(1.00)).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }
}
