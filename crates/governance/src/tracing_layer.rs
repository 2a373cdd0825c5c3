//! Log and trace subscriber configuration.

use ai_agent_core::{config::LoggingConfig, Error, Result};
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber.
///
/// Stdout gets text or JSON lines per `json_logs`. Spans are also exported
/// over OTLP when a collector endpoint is known.
pub fn configure_tracing(config: &LoggingConfig) -> Result<()> {
    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(fmt_layer);

    let Some(endpoint) = otlp_endpoint(config) else {
        registry.init();
        return Ok(());
    };

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint.clone()),
        )
        .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
            KeyValue::new("service.name", config.service_name.clone()),
        ])))
        .install_batch(runtime::Tokio)
        .map_err(|e| Error::Config(format!("Failed to install OTLP pipeline: {}", e)))?;
    let tracer = provider.tracer(config.service_name.clone());

    registry
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();
    tracing::info!(endpoint = %endpoint, service = %config.service_name, "OpenTelemetry export enabled");

    Ok(())
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

fn otlp_endpoint(config: &LoggingConfig) -> Option<String> {
    std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .or_else(|| config.otlp_endpoint.clone())
        .filter(|e| !e.trim().is_empty())
}
