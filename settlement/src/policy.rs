//! Settlement decision policies
//!
//! The sweep resolves each eligible payment with a terminal decision. The
//! policy is an interface so tests substitute a deterministic policy for
//! the weighted-random one that simulates the external gateway.

use payment_core::Payment;
use rand::Rng;

/// Terminal decision for a payment awaiting settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDecision {
    /// Approve the parked authorization (runs the conditional debit)
    Approve,
    /// Reject it
    Reject,
}

/// Decides the outcome of a payment awaiting asynchronous confirmation
pub trait DecisionPolicy: Send + Sync {
    /// Decide the terminal outcome for `payment`
    fn decide(&self, payment: &Payment) -> SweepDecision;
}

/// Pseudo-random policy weighted toward approval
pub struct WeightedPolicy {
    approve_ratio: f64,
}

impl WeightedPolicy {
    /// Create a policy approving with probability `approve_ratio`
    pub fn new(approve_ratio: f64) -> Self {
        Self {
            approve_ratio: approve_ratio.clamp(0.0, 1.0),
        }
    }
}

impl Default for WeightedPolicy {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl DecisionPolicy for WeightedPolicy {
    fn decide(&self, _payment: &Payment) -> SweepDecision {
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < self.approve_ratio {
            SweepDecision::Approve
        } else {
            SweepDecision::Reject
        }
    }
}

/// Deterministic policy for tests
pub struct FixedPolicy(pub SweepDecision);

impl DecisionPolicy for FixedPolicy {
    fn decide(&self, _payment: &Payment) -> SweepDecision {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_core::{Currency, PaymentDraft};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn payment() -> Payment {
        payment_core::Payment::from_draft(PaymentDraft {
            payer_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            request_id: None,
            subtotal: dec!(100.00),
            taxes: dec!(0.00),
            fees: dec!(0.00),
            currency: Currency::USD,
            metadata: HashMap::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_weighted_policy_extremes() {
        let payment = payment();

        let always = WeightedPolicy::new(1.0);
        let never = WeightedPolicy::new(0.0);
        for _ in 0..100 {
            assert_eq!(always.decide(&payment), SweepDecision::Approve);
            assert_eq!(never.decide(&payment), SweepDecision::Reject);
        }
    }

    #[test]
    fn test_weighted_policy_clamps_ratio() {
        let policy = WeightedPolicy::new(7.5);
        let payment = payment();
        for _ in 0..50 {
            assert_eq!(policy.decide(&payment), SweepDecision::Approve);
        }
    }

    #[test]
    fn test_fixed_policy() {
        let payment = payment();
        assert_eq!(
            FixedPolicy(SweepDecision::Reject).decide(&payment),
            SweepDecision::Reject
        );
    }
}
