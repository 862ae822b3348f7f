//! NATS consumers for the coordination gateway
//!
//! Two inbound subjects: coordination requests (create a payment) and
//! commands (approve/reject/cancel/capture). Every envelope id is recorded
//! before processing; duplicate deliveries are skipped so a redelivered
//! command never double-applies a transition.

use crate::models::{CommandMessage, CoordinationRequest};
use async_trait::async_trait;
use message_bus::{Message, MessageHandler, MessageType, NatsClient, Subscriber};
use payment_core::{Currency, PaymentDraft, PaymentLedger};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Handler for inbound coordination requests
pub struct RequestHandler {
    ledger: Arc<PaymentLedger>,
}

#[async_trait]
impl MessageHandler for RequestHandler {
    async fn handle(&self, message: Message) -> message_bus::Result<()> {
        if !self
            .ledger
            .mark_processed(message.id)
            .map_err(|e| message_bus::Error::Handler(e.to_string()))?
        {
            info!("⏭️  Skipping duplicate coordination request {}", message.id);
            return Ok(());
        }

        let request: CoordinationRequest = serde_json::from_value(message.payload)
            .map_err(|e| message_bus::Error::Deserialization(e.to_string()))?;

        let currency = Currency::parse(&request.currency).ok_or_else(|| {
            message_bus::Error::Handler(format!("unknown currency {}", request.currency))
        })?;

        let mut metadata = HashMap::new();
        if let Some(description) = request.description {
            metadata.insert("description".to_string(), description);
        }
        if let Some(method) = request.payment_method_type {
            metadata.insert("payment_method_type".to_string(), method);
        }

        let draft = PaymentDraft {
            payer_id: request.user_id,
            provider_id: request.provider_id,
            request_id: request.matching_id,
            subtotal: request.amount,
            taxes: request.taxes,
            fees: request.fees,
            currency,
            metadata,
        };

        let payment = self
            .ledger
            .create_payment(draft)
            .await
            .map_err(|e| message_bus::Error::Handler(e.to_string()))?;

        info!(
            "💳 Created payment {} from coordination request (matching: {:?})",
            payment.id, payment.request_id
        );

        Ok(())
    }
}

/// Handler for inbound payment commands
pub struct CommandHandler {
    ledger: Arc<PaymentLedger>,
}

#[async_trait]
impl MessageHandler for CommandHandler {
    async fn handle(&self, message: Message) -> message_bus::Result<()> {
        if !self
            .ledger
            .mark_processed(message.id)
            .map_err(|e| message_bus::Error::Handler(e.to_string()))?
        {
            info!("⏭️  Skipping duplicate command {}", message.id);
            return Ok(());
        }

        let command: CommandMessage = serde_json::from_value(message.payload)
            .map_err(|e| message_bus::Error::Deserialization(e.to_string()))?;

        match self
            .ledger
            .apply_command(command.payment_id, command.command, command.reason)
            .await
        {
            Ok(payment) => {
                info!(
                    "✅ Applied {:?} to payment {} (status: {})",
                    command.command, payment.id, payment.status
                );
                Ok(())
            }
            Err(e) => {
                // Unreachable transitions fail loudly; the error surfaces in
                // logs and receive metrics but never stops the consumer.
                error!(
                    "❌ Command {:?} for payment {} failed: {}",
                    command.command, command.payment_id, e
                );
                Err(message_bus::Error::Handler(e.to_string()))
            }
        }
    }
}

/// Start the gateway consumers
pub fn start_consumers(client: Arc<NatsClient>, ledger: Arc<PaymentLedger>) {
    info!("📡 Starting coordination gateway consumers...");

    let request_subscriber = Subscriber::new(client.clone(), MessageType::PaymentRequested);
    let request_handler = Arc::new(RequestHandler {
        ledger: ledger.clone(),
    });
    tokio::spawn(async move {
        if let Err(e) = request_subscriber.run(request_handler).await {
            warn!("Coordination request consumer ended: {}", e);
        }
    });

    let command_subscriber = Subscriber::new(client, MessageType::PaymentCommand);
    let command_handler = Arc::new(CommandHandler { ledger });
    tokio::spawn(async move {
        if let Err(e) = command_subscriber.run(command_handler).await {
            warn!("Command consumer ended: {}", e);
        }
    });
}
