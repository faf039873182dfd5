//! Tracing Setup
//!
//! Builds the global `tracing` subscriber from [`ObservabilityConfig`]:
//! an `EnvFilter`, a JSON or pretty `fmt` layer, and optionally an
//! OpenTelemetry layer exporting spans over OTLP gRPC.
//!
//! `RUST_LOG` overrides `observability.logging.level` when set.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trailing_stop_engine::telemetry::init_telemetry;
//!
//! let _guard = init_telemetry(&config.observability)?;
//! ```

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;

/// Guard that shuts down the tracer provider on drop.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Whether spans are exported over OTLP.
    #[must_use]
    pub const fn exports_spans(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e:?}");
            }
        }
    }
}

/// Telemetry initialization error.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Filter from `RUST_LOG`, falling back to the configured level.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn otlp_provider(endpoint: &str) -> Option<SdkTracerProvider> {
    match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => Some(
            SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .build(),
        ),
        Err(e) => {
            eprintln!("Failed to create OTLP exporter: {e:?}, falling back to console logging");
            None
        }
    }
}

/// Install the global subscriber.
///
/// Returns a guard that shuts the tracer provider down when dropped.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<TelemetryGuard, TelemetryError> {
    let filter = env_filter(&config.logging.level);
    let json = config.logging.format == "json";

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
    });
    let pretty_layer = (!json).then(|| tracing_subscriber::fmt::layer().pretty());

    let provider = if config.otel.enabled {
        otlp_provider(&config.otel.endpoint)
    } else {
        None
    };
    let otel_layer = provider.as_ref().map(|p| {
        tracing_opentelemetry::layer().with_tracer(p.tracer(config.otel.service_name.clone()))
    });

    Registry::default()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    if provider.is_some() {
        tracing::info!(
            service_name = %config.otel.service_name,
            endpoint = %config.otel.endpoint,
            "OpenTelemetry initialized"
        );
    }

    Ok(TelemetryGuard { provider })
}
