//! This file defines the aircraft-api binary entry point.

use aircraft_api::app;
use aircraft_api::cli;
use aircraft_api::metrics;
use aircraft_api::server;
use aircraft_api::tracing;

use std::process::exit;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    ::tracing::debug!("{:?}", args);
    metrics::register_metrics();
    let service = match app::service(&args).await {
        Ok(service) => service,
        Err(err) => {
            ::tracing::error!("Failed to initialise service: {}", err);
            tracing::shutdown_tracing();
            exit(1)
        }
    };
    server::serve(&args, service).await;
    ::tracing::info!("Server stopped");
    tracing::shutdown_tracing();
}
