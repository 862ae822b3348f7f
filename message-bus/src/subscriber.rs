//! Message subscriber dispatching to a handler

use crate::{
    client::NatsClient,
    message::Message,
    metrics::MESSAGE_RECEIVE_TOTAL,
    types::MessageType,
    Result,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Message handler trait
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle incoming message
    async fn handle(&self, message: Message) -> Result<()>;
}

/// Message subscriber
///
/// Consumes one message type's subject tree and dispatches each decoded
/// envelope to the handler. Handler failures are logged and do not stop
/// the subscription.
pub struct Subscriber {
    client: Arc<NatsClient>,
    message_type: MessageType,
}

impl Subscriber {
    /// Create new subscriber
    pub fn new(client: Arc<NatsClient>, message_type: MessageType) -> Self {
        Self {
            client,
            message_type,
        }
    }

    /// Subscribe and process messages until the subscription ends
    pub async fn run<H>(&self, handler: Arc<H>) -> Result<()>
    where
        H: MessageHandler + 'static,
    {
        let subject = self.message_type.wildcard_subject();
        let mut subscription = self.client.subscribe(subject.clone()).await?;
        let type_label = self.message_type.subject_prefix();

        info!("Subscribed to {}", subject);

        while let Some(msg) = subscription.next().await {
            let message = match Message::from_bytes(&msg.payload) {
                Ok(message) => message,
                Err(e) => {
                    error!("Failed to decode message on {}: {}", subject, e);
                    MESSAGE_RECEIVE_TOTAL
                        .with_label_values(&[type_label, "decode_error"])
                        .inc();
                    continue;
                }
            };

            let status = match handler.handle(message).await {
                Ok(()) => "success",
                Err(e) => {
                    error!("Handler failed for message on {}: {}", subject, e);
                    "handler_error"
                }
            };
            MESSAGE_RECEIVE_TOTAL
                .with_label_values(&[type_label, status])
                .inc();
        }

        warn!("Subscription to {} ended", subject);
        Ok(())
    }
}
