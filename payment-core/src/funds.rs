//! Funds movement: the conditional debit/credit primitive
//!
//! A debit is a compare-and-mutate: decrement the instrument balance by the
//! payment total only if the currency matches and the available balance
//! covers it. The plan reports affected-row semantics (0 or 1) and the
//! writer commits the mutated instrument together with the attempt record
//! and timeline events in one batch, so two interleaved authorizations can
//! never both observe the same pre-debit balance.
//!
//! Instruments without a local balance (external wallets routed to a
//! third-party gateway) skip the mutation entirely but produce the same
//! Attempt/Event contract, keeping the observable behavior uniform across
//! instrument kinds.

use crate::types::{FundingInstrument, Payment};
use rust_decimal::Decimal;

/// Why a conditional debit declined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// Available balance below the payment total
    InsufficientFunds,
    /// Instrument currency does not match the payment currency
    CurrencyMismatch,
    /// Instrument has been deactivated
    InstrumentInactive,
}

impl DeclineReason {
    /// Stable reason string recorded on attempts and events
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclineReason::InsufficientFunds => "insufficient_funds",
            DeclineReason::CurrencyMismatch => "currency_mismatch",
            DeclineReason::InstrumentInactive => "instrument_inactive",
        }
    }

    /// Balance-related declines set the payment's retry-eligible flag
    pub fn is_balance_related(&self) -> bool {
        matches!(self, DeclineReason::InsufficientFunds)
    }
}

/// Outcome of planning a conditional debit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Mutation applies (or instrument carries no local balance)
    Applied,
    /// Mutation does not apply
    Declined(DeclineReason),
}

/// A planned conditional debit, not yet committed
#[derive(Debug, Clone)]
pub struct DebitPlan {
    /// Whether the guarded mutation applies
    pub outcome: DebitOutcome,
    /// The instrument with the decremented balance, when a mutation applies
    pub updated_instrument: Option<FundingInstrument>,
}

impl DebitPlan {
    /// Affected-row count of the conditional mutation (0 or 1)
    pub fn rows_affected(&self) -> u32 {
        self.updated_instrument.is_some() as u32
    }
}

/// Plan the conditional debit of `payment.total` against `instrument`
pub fn plan_debit(instrument: &FundingInstrument, payment: &Payment) -> DebitPlan {
    if !instrument.active {
        return DebitPlan {
            outcome: DebitOutcome::Declined(DeclineReason::InstrumentInactive),
            updated_instrument: None,
        };
    }

    if !instrument.kind.has_local_balance() {
        // Routed to an external gateway; approved unconditionally
        return DebitPlan {
            outcome: DebitOutcome::Applied,
            updated_instrument: None,
        };
    }

    if instrument.currency != payment.currency {
        return DebitPlan {
            outcome: DebitOutcome::Declined(DeclineReason::CurrencyMismatch),
            updated_instrument: None,
        };
    }

    if instrument.balance < payment.total {
        return DebitPlan {
            outcome: DebitOutcome::Declined(DeclineReason::InsufficientFunds),
            updated_instrument: None,
        };
    }

    let mut updated = instrument.clone();
    updated.balance -= payment.total;

    DebitPlan {
        outcome: DebitOutcome::Applied,
        updated_instrument: Some(updated),
    }
}

/// Plan the credit of `amount` back onto `instrument`
///
/// Crediting cannot drive a balance negative, so there is no sufficiency
/// check. Returns `None` for instruments without a local balance (the event
/// contract is still produced by the caller).
pub fn plan_credit(instrument: &FundingInstrument, amount: Decimal) -> Option<FundingInstrument> {
    if !instrument.kind.has_local_balance() {
        return None;
    }
    let mut updated = instrument.clone();
    updated.balance += amount;
    Some(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, InstrumentKind, PaymentDraft};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn payment_of(total_parts: (Decimal, Decimal, Decimal), currency: Currency) -> Payment {
        Payment::from_draft(PaymentDraft {
            payer_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            request_id: None,
            subtotal: total_parts.0,
            taxes: total_parts.1,
            fees: total_parts.2,
            currency,
            metadata: HashMap::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_debit_applies_and_decrements() {
        let instrument =
            FundingInstrument::new(InstrumentKind::TestCard, Currency::USD, dec!(200.00));
        let payment = payment_of((dec!(100.00), dec!(10.00), dec!(5.00)), Currency::USD);

        let plan = plan_debit(&instrument, &payment);
        assert_eq!(plan.outcome, DebitOutcome::Applied);
        assert_eq!(plan.rows_affected(), 1);
        assert_eq!(plan.updated_instrument.unwrap().balance, dec!(85.00));
    }

    #[test]
    fn test_debit_declines_on_insufficient_balance() {
        let instrument =
            FundingInstrument::new(InstrumentKind::TestCard, Currency::USD, dec!(50.00));
        let payment = payment_of((dec!(100.00), dec!(10.00), dec!(5.00)), Currency::USD);

        let plan = plan_debit(&instrument, &payment);
        assert_eq!(
            plan.outcome,
            DebitOutcome::Declined(DeclineReason::InsufficientFunds)
        );
        assert_eq!(plan.rows_affected(), 0);
    }

    #[test]
    fn test_debit_declines_on_currency_mismatch() {
        let instrument =
            FundingInstrument::new(InstrumentKind::Wallet, Currency::EUR, dec!(500.00));
        let payment = payment_of((dec!(100.00), dec!(0.00), dec!(0.00)), Currency::USD);

        let plan = plan_debit(&instrument, &payment);
        assert_eq!(
            plan.outcome,
            DebitOutcome::Declined(DeclineReason::CurrencyMismatch)
        );
    }

    #[test]
    fn test_debit_declines_on_inactive_instrument() {
        let mut instrument =
            FundingInstrument::new(InstrumentKind::Wallet, Currency::USD, dec!(500.00));
        instrument.active = false;
        let payment = payment_of((dec!(100.00), dec!(0.00), dec!(0.00)), Currency::USD);

        let plan = plan_debit(&instrument, &payment);
        assert_eq!(
            plan.outcome,
            DebitOutcome::Declined(DeclineReason::InstrumentInactive)
        );
    }

    #[test]
    fn test_external_wallet_approves_without_mutation() {
        let instrument =
            FundingInstrument::new(InstrumentKind::ExternalWallet, Currency::USD, Decimal::ZERO);
        let payment = payment_of((dec!(1000.00), dec!(0.00), dec!(0.00)), Currency::USD);

        let plan = plan_debit(&instrument, &payment);
        assert_eq!(plan.outcome, DebitOutcome::Applied);
        assert_eq!(plan.rows_affected(), 0);
        assert!(plan.updated_instrument.is_none());
    }

    #[test]
    fn test_exact_balance_is_sufficient() {
        let instrument =
            FundingInstrument::new(InstrumentKind::Wallet, Currency::USD, dec!(115.00));
        let payment = payment_of((dec!(100.00), dec!(10.00), dec!(5.00)), Currency::USD);

        let plan = plan_debit(&instrument, &payment);
        assert_eq!(plan.outcome, DebitOutcome::Applied);
        assert_eq!(plan.updated_instrument.unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_credit_increments_balance() {
        let instrument =
            FundingInstrument::new(InstrumentKind::TestCard, Currency::USD, dec!(85.00));
        let updated = plan_credit(&instrument, dec!(40.00)).unwrap();
        assert_eq!(updated.balance, dec!(125.00));
    }

    #[test]
    fn test_credit_is_noop_for_external_wallet() {
        let instrument =
            FundingInstrument::new(InstrumentKind::ExternalWallet, Currency::USD, Decimal::ZERO);
        assert!(plan_credit(&instrument, dec!(40.00)).is_none());
    }

    #[test]
    fn test_decline_reason_flags() {
        assert!(DeclineReason::InsufficientFunds.is_balance_related());
        assert!(!DeclineReason::CurrencyMismatch.is_balance_related());
        assert_eq!(DeclineReason::InsufficientFunds.as_str(), "insufficient_funds");
    }
}
