//! Type definitions for the message bus

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Inbound coordination request: create a payment
    PaymentRequested,
    /// Inbound command: approve/reject/cancel/capture a payment
    PaymentCommand,
    /// Outbound status update after a ledger transition
    StatusUpdated,
    /// Outbound raw timeline event for external audit consumers
    TimelineEvent,
}

impl MessageType {
    /// Get NATS subject prefix for this message type
    pub fn subject_prefix(&self) -> &'static str {
        match self {
            MessageType::PaymentRequested => "paylane.payment.requested",
            MessageType::PaymentCommand => "paylane.payment.command",
            MessageType::StatusUpdated => "paylane.payment.status",
            MessageType::TimelineEvent => "paylane.payment.timeline",
        }
    }

    /// Wildcard subject matching every partition of this message type
    pub fn wildcard_subject(&self) -> String {
        format!("{}.>", self.subject_prefix())
    }
}

/// Partition key for routing messages
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionKey {
    /// Partition by payment id
    Payment(Uuid),
    /// Broadcast to all consumers
    Broadcast,
}

impl PartitionKey {
    /// Get partitioning segment for the NATS subject
    pub fn to_subject_segment(&self) -> String {
        match self {
            PartitionKey::Payment(id) => format!("payment.{}", id),
            PartitionKey::Broadcast => "broadcast".to_string(),
        }
    }
}
