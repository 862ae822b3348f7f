//! Gateway-backed transition notifier
//!
//! Publishes a status update after every ledger transition and the raw
//! timeline events for external audit consumers. Publication is
//! best-effort: the ledger write has already committed, so failures are
//! logged and never bubble back into payment processing.

use async_trait::async_trait;
use message_bus::{Message, MessageType, PartitionKey, Publisher};
use payment_core::{PaymentEvent, StatusUpdate, TransitionNotifier};
use tracing::{debug, error};

/// Notifier publishing over the coordination gateway
pub struct NatsNotifier {
    publisher: Publisher,
}

impl NatsNotifier {
    /// Create a new notifier
    pub fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl TransitionNotifier for NatsNotifier {
    async fn status_changed(&self, update: &StatusUpdate) {
        let payload = match serde_json::to_value(update) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize status update: {}", e);
                return;
            }
        };

        let message = Message::new(
            MessageType::StatusUpdated,
            PartitionKey::Payment(update.payment_id),
            payload,
        );

        if let Err(e) = self.publisher.publish(&message).await {
            error!(
                "Failed to publish status update for payment {}: {}",
                update.payment_id, e
            );
        } else {
            debug!(
                "Published status update {} -> {} for payment {}",
                update.old_status, update.new_status, update.payment_id
            );
        }
    }

    async fn event_appended(&self, event: &PaymentEvent) {
        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize timeline event: {}", e);
                return;
            }
        };

        let message = Message::new(
            MessageType::TimelineEvent,
            PartitionKey::Payment(event.payment_id),
            payload,
        );

        if let Err(e) = self.publisher.publish(&message).await {
            error!(
                "Failed to publish timeline event for payment {}: {}",
                event.payment_id, e
            );
        }
    }
}
