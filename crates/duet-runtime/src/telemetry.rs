//! Logging and trace export setup.
//!
//! Call [`init_tracing`] once at process start.  Library crates only emit
//! `tracing` events; this is the single place a subscriber is installed.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `DUET_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP/HTTP collector base URL. When set, spans are exported. |
//!
//! # Example
//!
//! ```rust,no_run
//! let _guard = duet_runtime::telemetry::init_tracing("duet");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// The returned guard must outlive every traced operation; dropping it
/// flushes and shuts down the span exporter.  Calling this twice leaves the
/// first subscriber in place.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var("DUET_LOG_FORMAT").as_deref() == Ok("json");

    let provider = build_provider(service_name);
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("duet")));
    let fmt_layer = if use_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().compact().boxed()
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .with(env_filter)
        .try_init()
    {
        eprintln!("[duet] tracing subscriber already installed: {e}");
    }

    TracerProviderGuard(provider)
}

/// Shuts the span exporter down on drop.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// `true` when spans are being exported.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[duet] OpenTelemetry provider shutdown error: {e}");
        }
    }
}

/// Exporter pipeline for `OTEL_EXPORTER_OTLP_ENDPOINT`, or `None` when the
/// variable is unset or the exporter fails to build.
fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[duet] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Simple (synchronous) export: the simulation has no async runtime.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_endpoint_means_no_exporter() {
        // SAFETY: no other test in this crate touches this variable.
        unsafe { std::env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT") };
        assert!(build_provider("duet-test").is_none());
    }

    #[test]
    fn empty_guard_drops_cleanly() {
        let guard = TracerProviderGuard(None);
        assert!(!guard.is_exporting());
        drop(guard);
    }
}
