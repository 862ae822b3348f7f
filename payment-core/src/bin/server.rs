//! Standalone payment ledger server binary
//!
//! Opens the ledger and keeps it running; the full service with the HTTP
//! API and coordination gateway wiring lives in `services/payment-engine`.

use payment_core::{Config, PaymentLedger};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Paylane payment ledger");

    // Load configuration
    let config = Config::from_env()?;

    // Open ledger
    let ledger = PaymentLedger::open(config).await?;
    tracing::info!("Payment ledger opened successfully");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down payment ledger");
    ledger.shutdown().await?;
    Ok(())
}
