//! Tracing (logging)

use crate::cli::CommandLineArgs;

use opentelemetry::global;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Service name reported to Jaeger
const SERVICE_NAME: &str = "aircraft-api";

/// Initlialise tracing (logging)
///
/// Applies a filter based on the `RUST_LOG` environment variable, falling back to enable debug
/// logging for this crate and tower_http if not set.
///
/// If Jaeger is enabled, spans are also exported to a Jaeger agent. Failure to set up the
/// exporter is logged and otherwise ignored.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn init_tracing(args: &CommandLineArgs) {
    let (jaeger_layer, jaeger_error) = if args.enable_jaeger {
        global::set_text_map_propagator(opentelemetry_jaeger::Propagator::new());
        match opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name(SERVICE_NAME)
            .install_simple()
        {
            Ok(tracer) => (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                None,
            ),
            Err(err) => (None, Some(err)),
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aircraft_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(jaeger_layer)
        .init();

    if let Some(err) = jaeger_error {
        tracing::warn!("Failed to initialise Jaeger exporter: {}", err);
    }
}

/// Flush any remaining spans and shut down the tracer provider.
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}
