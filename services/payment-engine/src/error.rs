//! HTTP error mapping for the payment engine

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

/// Service-level error wrapping the domain errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Payment ledger error
    #[error(transparent)]
    Core(#[from] payment_core::Error),

    /// Coordination gateway error
    #[error("Gateway error: {0}")]
    Bus(#[from] message_bus::Error),

    /// Malformed request rejected at the edge
    #[error("Validation error: {0}")]
    Validation(String),
}

impl EngineError {
    fn error_type(&self) -> &str {
        match self {
            EngineError::Core(e) => e.code(),
            EngineError::Bus(_) => "gateway_error",
            EngineError::Validation(_) => "validation_error",
        }
    }
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        use payment_core::Error as Core;
        match self {
            EngineError::Core(e) => match e {
                Core::Validation(_) => StatusCode::BAD_REQUEST,
                Core::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
                Core::PaymentDeclined(_) => StatusCode::UNPROCESSABLE_ENTITY,
                Core::InvalidStateTransition { .. } => StatusCode::CONFLICT,
                Core::PaymentNotFound(_)
                | Core::RefundNotFound(_)
                | Core::InstrumentNotFound(_) => StatusCode::NOT_FOUND,
                Core::RetryLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            EngineError::Bus(_) => StatusCode::BAD_GATEWAY,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type()
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_core::PaymentStatus;

    #[test]
    fn test_status_codes() {
        let not_found = EngineError::Core(payment_core::Error::PaymentNotFound("x".into()));
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let conflict = EngineError::Core(payment_core::Error::InvalidStateTransition {
            from: PaymentStatus::Rejected,
            to: PaymentStatus::Approved,
        });
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let invalid = EngineError::Core(payment_core::Error::InvalidAmount("too much".into()));
        assert_eq!(invalid.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let retries = EngineError::Core(payment_core::Error::RetryLimitExceeded("x".into()));
        assert_eq!(retries.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_error_types_are_distinct() {
        let a = EngineError::Core(payment_core::Error::PaymentNotFound("x".into()));
        let b = EngineError::Validation("bad".into());
        assert_ne!(a.error_type(), b.error_type());
    }
}
