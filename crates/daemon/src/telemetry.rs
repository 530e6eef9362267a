//! OpenTelemetry integration
//!
//! Spans are exported over OTLP when `telemetry.otlp_endpoint` is configured
//! and the daemon is built with the `telemetry` feature.

use crate::config::TelemetryConfig;
use anyhow::Result;
use tracing_subscriber::{Layer, Registry};

pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Export layer for the configured endpoint, if any
pub fn layer(config: &TelemetryConfig) -> Result<Option<BoxedLayer>> {
    let Some(endpoint) = config.otlp_endpoint.as_deref() else {
        return Ok(None);
    };

    #[cfg(feature = "telemetry")]
    {
        Ok(Some(otlp_layer(endpoint, &config.service_name)?))
    }

    #[cfg(not(feature = "telemetry"))]
    {
        // The subscriber is not installed yet; stderr is the only channel
        eprintln!(
            "telemetry.otlp_endpoint is set to {} but the 'telemetry' feature is not enabled; \
             rebuild with: cargo build --features telemetry",
            endpoint
        );
        Ok(None)
    }
}

/// Flush pending spans
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(feature = "telemetry")]
fn otlp_layer(endpoint: &str, service_name: &str) -> Result<BoxedLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build();
    let tracer = provider.tracer(service_name.to_string());
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer).boxed())
}
