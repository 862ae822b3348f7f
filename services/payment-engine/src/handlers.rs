//! HTTP handlers for the payment engine

use crate::error::EngineError;
use crate::models::{
    CommandRequest, CreateInstrumentRequest, CreatePaymentRequest, RefundRequest,
    ReviewRefundRequest, SelectInstrumentRequest, TimelineQuery, TopUpRequest,
};
use actix_web::{web, HttpResponse};
use payment_core::{Order, PaymentLedger};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Health check endpoint
pub async fn health_check(ledger: web::Data<Arc<PaymentLedger>>) -> HttpResponse {
    let stats = ledger.stats().ok();
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "payment-engine",
        "version": env!("CARGO_PKG_VERSION"),
        "payments": stats.as_ref().map(|s| s.total_payments),
        "events": stats.as_ref().map(|s| s.total_events),
    }))
}

/// Prometheus metrics endpoint
///
/// Exposes both the ledger registry and the process-wide default registry
/// (bus metrics).
pub async fn metrics(ledger: web::Data<Arc<PaymentLedger>>) -> HttpResponse {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();

    let mut families = ledger.metrics().registry().gather();
    families.extend(prometheus::gather());

    if let Err(e) = encoder.encode(&families, &mut buffer) {
        return HttpResponse::InternalServerError().body(e.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

/// Create a payment
pub async fn create_payment(
    ledger: web::Data<Arc<PaymentLedger>>,
    request: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, EngineError> {
    let request = request.into_inner();
    request
        .validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    let payment = ledger.create_payment(request.into_draft()?).await?;
    Ok(HttpResponse::Created().json(payment))
}

/// Get a payment
pub async fn get_payment(
    ledger: web::Data<Arc<PaymentLedger>>,
    payment_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let payment = ledger.payment(*payment_id)?;
    Ok(HttpResponse::Ok().json(payment))
}

/// Attach a funding instrument to a payment
pub async fn select_instrument(
    ledger: web::Data<Arc<PaymentLedger>>,
    payment_id: web::Path<Uuid>,
    request: web::Json<SelectInstrumentRequest>,
) -> Result<HttpResponse, EngineError> {
    let payment = ledger
        .select_instrument(*payment_id, request.instrument_id)
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

/// Authorize a payment
pub async fn authorize(
    ledger: web::Data<Arc<PaymentLedger>>,
    payment_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let payment = ledger.authorize(*payment_id).await?;
    Ok(HttpResponse::Ok().json(payment))
}

/// Retry an authorization after an insufficient-funds decline
pub async fn retry(
    ledger: web::Data<Arc<PaymentLedger>>,
    payment_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let payment = ledger.retry(*payment_id).await?;
    Ok(HttpResponse::Ok().json(payment))
}

/// Apply a gateway command to a payment
pub async fn apply_command(
    ledger: web::Data<Arc<PaymentLedger>>,
    payment_id: web::Path<Uuid>,
    request: web::Json<CommandRequest>,
) -> Result<HttpResponse, EngineError> {
    let request = request.into_inner();
    let payment = ledger
        .apply_command(*payment_id, request.command, request.reason)
        .await?;
    Ok(HttpResponse::Ok().json(payment))
}

/// Get the event timeline for a payment
pub async fn get_timeline(
    ledger: web::Data<Arc<PaymentLedger>>,
    payment_id: web::Path<Uuid>,
    query: web::Query<TimelineQuery>,
) -> Result<HttpResponse, EngineError> {
    let order = match query.order.as_deref() {
        Some("desc") => Order::Descending,
        _ => Order::Ascending,
    };
    let events = ledger.timeline(*payment_id, order)?;
    Ok(HttpResponse::Ok().json(json!({
        "payment_id": *payment_id,
        "count": events.len(),
        "events": events,
    })))
}

/// Get the attempt log for a payment
pub async fn get_attempts(
    ledger: web::Data<Arc<PaymentLedger>>,
    payment_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let attempts = ledger.attempts(*payment_id)?;
    Ok(HttpResponse::Ok().json(attempts))
}

/// List refunds with the remaining refundable amount
pub async fn get_refunds(
    ledger: web::Data<Arc<PaymentLedger>>,
    payment_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let refunds = ledger.refunds(*payment_id)?;
    let remaining = ledger.remaining_refundable(*payment_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "payment_id": *payment_id,
        "remaining_refundable": remaining,
        "refunds": refunds,
    })))
}

/// Request a refund
pub async fn create_refund(
    ledger: web::Data<Arc<PaymentLedger>>,
    payment_id: web::Path<Uuid>,
    request: web::Json<RefundRequest>,
) -> Result<HttpResponse, EngineError> {
    let request = request.into_inner();
    request
        .validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    let refund = ledger
        .create_refund(*payment_id, request.amount, request.reason, request.requested_by)
        .await?;
    Ok(HttpResponse::Created().json(refund))
}

/// Review a pending refund
pub async fn review_refund(
    ledger: web::Data<Arc<PaymentLedger>>,
    refund_id: web::Path<Uuid>,
    request: web::Json<ReviewRefundRequest>,
) -> Result<HttpResponse, EngineError> {
    let request = request.into_inner();
    let refund = ledger
        .review_refund(*refund_id, request.approve, request.reviewer, request.message)
        .await?;
    Ok(HttpResponse::Ok().json(refund))
}

/// Complete a refund (credit the funds back)
pub async fn complete_refund(
    ledger: web::Data<Arc<PaymentLedger>>,
    refund_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let refund = ledger.complete_refund(*refund_id).await?;
    Ok(HttpResponse::Ok().json(refund))
}

/// Register a funding instrument
pub async fn create_instrument(
    ledger: web::Data<Arc<PaymentLedger>>,
    request: web::Json<CreateInstrumentRequest>,
) -> Result<HttpResponse, EngineError> {
    let request = request.into_inner();
    let (kind, currency) = request.resolve()?;
    let instrument = ledger.create_instrument(kind, currency, request.balance).await?;
    Ok(HttpResponse::Created().json(instrument))
}

/// Get a funding instrument
pub async fn get_instrument(
    ledger: web::Data<Arc<PaymentLedger>>,
    instrument_id: web::Path<Uuid>,
) -> Result<HttpResponse, EngineError> {
    let instrument = ledger.instrument(*instrument_id)?;
    Ok(HttpResponse::Ok().json(instrument))
}

/// Top up a funding instrument
pub async fn top_up_instrument(
    ledger: web::Data<Arc<PaymentLedger>>,
    instrument_id: web::Path<Uuid>,
    request: web::Json<TopUpRequest>,
) -> Result<HttpResponse, EngineError> {
    let instrument = ledger.top_up_instrument(*instrument_id, request.amount).await?;
    Ok(HttpResponse::Ok().json(instrument))
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics))
        .service(
            web::scope("/api/v1")
                .route("/payments", web::post().to(create_payment))
                .route("/payments/{id}", web::get().to(get_payment))
                .route("/payments/{id}/instrument", web::post().to(select_instrument))
                .route("/payments/{id}/authorize", web::post().to(authorize))
                .route("/payments/{id}/retry", web::post().to(retry))
                .route("/payments/{id}/command", web::post().to(apply_command))
                .route("/payments/{id}/timeline", web::get().to(get_timeline))
                .route("/payments/{id}/attempts", web::get().to(get_attempts))
                .route("/payments/{id}/refunds", web::get().to(get_refunds))
                .route("/payments/{id}/refunds", web::post().to(create_refund))
                .route("/refunds/{id}/review", web::post().to(review_refund))
                .route("/refunds/{id}/complete", web::post().to(complete_refund))
                .route("/instruments", web::post().to(create_instrument))
                .route("/instruments/{id}", web::get().to(get_instrument))
                .route("/instruments/{id}/topup", web::post().to(top_up_instrument)),
        );
}
