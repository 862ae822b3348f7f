//! Property-based tests for payment ledger invariants
//!
//! These tests use proptest to verify the monetary invariants:
//! - Total invariant: total == subtotal + taxes + fees, fixed at creation
//! - No overdraft: instrument balances never go negative
//! - Refund ceiling: reservations never exceed the authorized total
//! - Monotonic attempt numbering: exactly 1..N, no gaps or duplicates
//! - Idempotent timeline reads

use payment_core::{
    Config, Currency, InstrumentKind, Order, PaymentDraft, PaymentLedger, PaymentStatus,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

/// Strategy for amounts between 1.00 and 500.00
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (100u64..50_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Strategy for small fee-like amounts (may be zero)
fn fee_strategy() -> impl Strategy<Value = Decimal> {
    (0u64..5_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

fn draft(subtotal: Decimal, taxes: Decimal, fees: Decimal) -> PaymentDraft {
    PaymentDraft {
        payer_id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        request_id: None,
        subtotal,
        taxes,
        fees,
        currency: Currency::USD,
        metadata: HashMap::new(),
    }
}

async fn create_test_ledger() -> (PaymentLedger, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    (PaymentLedger::open(config).await.unwrap(), temp_dir)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: total is the sum of its parts and never changes afterwards
    #[test]
    fn prop_total_invariant(
        subtotal in amount_strategy(),
        taxes in fee_strategy(),
        fees in fee_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let payment = ledger
                .create_payment(draft(subtotal, taxes, fees))
                .await
                .unwrap();
            prop_assert_eq!(payment.total, subtotal + taxes + fees);

            // Drive the payment through authorization; total must not move
            let instrument = ledger
                .create_instrument(InstrumentKind::Wallet, Currency::USD, payment.total)
                .await
                .unwrap();
            ledger.select_instrument(payment.id, instrument.id).await.unwrap();
            let authorized = ledger.authorize(payment.id).await.unwrap();

            prop_assert_eq!(authorized.total, subtotal + taxes + fees);
            prop_assert_eq!(authorized.status, PaymentStatus::Approved);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: a shared instrument is never overdrafted, whatever the mix
    /// of payment amounts thrown at it
    #[test]
    fn prop_no_overdraft(
        balance in (0u64..200_000u64).prop_map(|c| Decimal::new(c as i64, 2)),
        amounts in prop::collection::vec(amount_strategy(), 1..6),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let instrument = ledger
                .create_instrument(InstrumentKind::Wallet, Currency::USD, balance)
                .await
                .unwrap();

            let mut approved_total = Decimal::ZERO;
            for amount in &amounts {
                let payment = ledger
                    .create_payment(draft(*amount, Decimal::ZERO, Decimal::ZERO))
                    .await
                    .unwrap();
                ledger.select_instrument(payment.id, instrument.id).await.unwrap();
                let payment = ledger.authorize(payment.id).await.unwrap();

                if payment.status == PaymentStatus::Approved {
                    approved_total += *amount;
                }
            }

            let final_balance = ledger.instrument(instrument.id).unwrap().balance;
            prop_assert!(final_balance >= Decimal::ZERO);
            prop_assert_eq!(final_balance, balance - approved_total);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: accepted refund reservations never exceed the payment total
    #[test]
    fn prop_refund_ceiling(
        subtotal in amount_strategy(),
        requests in prop::collection::vec(amount_strategy(), 1..8),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let payment = ledger
                .create_payment(draft(subtotal, Decimal::ZERO, Decimal::ZERO))
                .await
                .unwrap();
            let instrument = ledger
                .create_instrument(InstrumentKind::Wallet, Currency::USD, payment.total)
                .await
                .unwrap();
            ledger.select_instrument(payment.id, instrument.id).await.unwrap();
            ledger.authorize(payment.id).await.unwrap();

            let mut accepted = Decimal::ZERO;
            for amount in &requests {
                match ledger
                    .create_refund(payment.id, *amount, "prop".to_string(), Uuid::new_v4())
                    .await
                {
                    Ok(refund) => {
                        accepted += *amount;
                        ledger.complete_refund(refund.id).await.unwrap();
                    }
                    Err(payment_core::Error::InvalidAmount(_)) => {}
                    Err(payment_core::Error::InvalidStateTransition { .. }) => {
                        // Payment reached REFUNDED; everything further must
                        // have zero remaining
                        break;
                    }
                    Err(e) => prop_assert!(false, "unexpected error: {}", e),
                }

                prop_assert!(accepted <= payment.total);
            }

            let remaining = ledger.remaining_refundable(payment.id).unwrap();
            prop_assert!(remaining >= Decimal::ZERO);
            prop_assert_eq!(remaining, payment.total - accepted);

            // Fully refunded payments must have transitioned
            if remaining == Decimal::ZERO {
                prop_assert_eq!(
                    ledger.payment(payment.id).unwrap().status,
                    PaymentStatus::Refunded
                );
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: attempt numbers are exactly 1..N with no gaps or duplicates
    #[test]
    fn prop_attempt_numbers_gapless(retries in 0u32..3) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            // An instrument that can never cover the payment
            let instrument = ledger
                .create_instrument(InstrumentKind::Wallet, Currency::USD, Decimal::new(1, 2))
                .await
                .unwrap();
            let payment = ledger
                .create_payment(draft(
                    Decimal::new(10_000, 2),
                    Decimal::ZERO,
                    Decimal::ZERO,
                ))
                .await
                .unwrap();
            ledger.select_instrument(payment.id, instrument.id).await.unwrap();
            ledger.authorize(payment.id).await.unwrap();

            for _ in 0..retries {
                ledger.retry(payment.id).await.unwrap();
            }

            let numbers: Vec<u32> = ledger
                .attempts(payment.id)
                .unwrap()
                .iter()
                .map(|a| a.number)
                .collect();
            let expected: Vec<u32> = (1..=retries + 1).collect();
            prop_assert_eq!(numbers, expected);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: reading the timeline twice without writes returns identical
    /// ordered results, in both orders
    #[test]
    fn prop_timeline_read_idempotent(
        subtotal in amount_strategy(),
        refund_fraction in 1u64..100,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger().await;

            let payment = ledger
                .create_payment(draft(subtotal, Decimal::ZERO, Decimal::ZERO))
                .await
                .unwrap();
            let instrument = ledger
                .create_instrument(InstrumentKind::Wallet, Currency::USD, payment.total)
                .await
                .unwrap();
            ledger.select_instrument(payment.id, instrument.id).await.unwrap();
            ledger.authorize(payment.id).await.unwrap();

            let refund_amount = (payment.total * Decimal::new(refund_fraction as i64, 2)).round_dp(2);
            if refund_amount > Decimal::ZERO && refund_amount <= payment.total {
                let refund = ledger
                    .create_refund(payment.id, refund_amount, "prop".to_string(), Uuid::new_v4())
                    .await
                    .unwrap();
                ledger.complete_refund(refund.id).await.unwrap();
            }

            let asc1 = ledger.timeline(payment.id, Order::Ascending).unwrap();
            let asc2 = ledger.timeline(payment.id, Order::Ascending).unwrap();
            prop_assert_eq!(
                asc1.iter().map(|e| e.id).collect::<Vec<_>>(),
                asc2.iter().map(|e| e.id).collect::<Vec<_>>()
            );

            let desc: Vec<Uuid> = ledger
                .timeline(payment.id, Order::Descending)
                .unwrap()
                .iter()
                .map(|e| e.id)
                .collect();
            let mut reversed: Vec<Uuid> = asc1.iter().map(|e| e.id).collect();
            reversed.reverse();
            prop_assert_eq!(desc, reversed);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}
