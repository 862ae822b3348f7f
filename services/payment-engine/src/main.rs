//! Payment engine service binary

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use message_bus::{NatsClient, Publisher, PublisherConfig};
use payment_engine::{
    config::Config, consumer, handlers, notifier::NatsNotifier,
};
use payment_core::PaymentLedger;
use settlement::{SettlementSweeper, SweepConfig, WeightedPolicy};
use std::sync::Arc;
use tracing::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting Paylane payment engine...");

    let config = Config::from_env().expect("Failed to load configuration");
    info!(
        "Configuration loaded - HTTP port: {}, gateway enabled: {}",
        config.http_port, config.gateway_enabled
    );

    // Open the payment ledger
    let mut core_config = payment_core::Config::default();
    core_config.data_dir = config.data_dir.clone().into();

    let mut ledger = PaymentLedger::open(core_config)
        .await
        .expect("Failed to open payment ledger");
    info!("Payment ledger opened successfully");

    // Wire the coordination gateway
    let nats_client = if config.gateway_enabled {
        let client = Arc::new(
            NatsClient::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS"),
        );
        let publisher = Publisher::new(client.clone(), PublisherConfig::default());
        ledger = ledger.with_notifier(Arc::new(NatsNotifier::new(publisher)));
        Some(client)
    } else {
        None
    };

    let ledger = Arc::new(ledger);

    if let Some(client) = nats_client {
        consumer::start_consumers(client, ledger.clone());
        info!("Coordination gateway consumers started");
    }

    // Start the settlement sweep
    let sweeper = Arc::new(SettlementSweeper::new(
        ledger.clone(),
        Arc::new(WeightedPolicy::new(config.approve_ratio)),
        SweepConfig {
            interval_secs: config.sweep_interval_secs,
            approval_delay_secs: config.approval_delay_secs,
            payment_ttl_secs: config.payment_ttl_secs,
        },
    ));
    tokio::spawn(sweeper.run());
    info!("Settlement sweeper started");

    // Start HTTP server
    let http_port = config.http_port;
    let ledger_data = web::Data::new(ledger);

    info!("Starting HTTP server on 0.0.0.0:{}", http_port);

    HttpServer::new(move || {
        App::new()
            .app_data(ledger_data.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(handlers::configure_routes)
    })
    .bind(("0.0.0.0", http_port))?
    .run()
    .await
}
