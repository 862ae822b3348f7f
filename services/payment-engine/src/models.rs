//! Request and wire models for the payment engine

use crate::error::EngineError;
use payment_core::{Currency, GatewayCommand, InstrumentKind, PaymentDraft};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Create-payment request body
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreatePaymentRequest {
    pub payer_id: Uuid,
    pub provider_id: Uuid,
    pub request_id: Option<Uuid>,
    pub subtotal: Decimal,
    #[serde(default)]
    pub taxes: Decimal,
    #[serde(default)]
    pub fees: Decimal,
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CreatePaymentRequest {
    /// Convert to a core draft, resolving the currency code
    pub fn into_draft(self) -> Result<PaymentDraft, EngineError> {
        let currency = Currency::parse(&self.currency)
            .ok_or_else(|| EngineError::Validation(format!("unknown currency {}", self.currency)))?;

        Ok(PaymentDraft {
            payer_id: self.payer_id,
            provider_id: self.provider_id,
            request_id: self.request_id,
            subtotal: self.subtotal,
            taxes: self.taxes,
            fees: self.fees,
            currency,
            metadata: self.metadata,
        })
    }
}

/// Create-instrument request body
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateInstrumentRequest {
    pub kind: String,
    pub currency: String,
    #[serde(default)]
    pub balance: Decimal,
}

impl CreateInstrumentRequest {
    /// Resolve string fields to core enums
    pub fn resolve(&self) -> Result<(InstrumentKind, Currency), EngineError> {
        let kind = InstrumentKind::parse(&self.kind)
            .ok_or_else(|| EngineError::Validation(format!("unknown instrument kind {}", self.kind)))?;
        let currency = Currency::parse(&self.currency)
            .ok_or_else(|| EngineError::Validation(format!("unknown currency {}", self.currency)))?;
        Ok((kind, currency))
    }
}

/// Select-instrument request body
#[derive(Debug, Deserialize, Serialize)]
pub struct SelectInstrumentRequest {
    pub instrument_id: Uuid,
}

/// Top-up request body
#[derive(Debug, Deserialize, Serialize)]
pub struct TopUpRequest {
    pub amount: Decimal,
}

/// Refund request body
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RefundRequest {
    pub amount: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub requested_by: Uuid,
}

/// Refund review request body
#[derive(Debug, Deserialize, Serialize)]
pub struct ReviewRefundRequest {
    pub approve: bool,
    pub reviewer: Uuid,
    pub message: Option<String>,
}

/// Gateway command request body
#[derive(Debug, Deserialize, Serialize)]
pub struct CommandRequest {
    pub command: GatewayCommand,
    pub reason: Option<String>,
}

/// Timeline query string
#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub order: Option<String>,
}

/// Inbound coordination request over the gateway
///
/// `amount` is the charge subtotal; taxes and fees default to zero when the
/// requesting service does not itemize them.
#[derive(Debug, Deserialize, Serialize)]
pub struct CoordinationRequest {
    pub matching_id: Option<Uuid>,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub amount: Decimal,
    #[serde(default)]
    pub taxes: Decimal,
    #[serde(default)]
    pub fees: Decimal,
    pub currency: String,
    pub payment_method_type: Option<String>,
    pub description: Option<String>,
}

/// Inbound command over the gateway
#[derive(Debug, Deserialize, Serialize)]
pub struct CommandMessage {
    pub payment_id: Uuid,
    pub command: GatewayCommand,
    pub reason: Option<String>,
}
