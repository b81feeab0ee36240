//! Tracing subscriber setup.

use super::tracer;
use crate::Config;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::resource::Resource;
use std::path::Path;
use std::sync::OnceLock;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Service name recorded on every exported span.
const SERVICE_NAME: &str = "pagesync";

/// Outcome of the first [`init_tracing`] call.
static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Installs the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `config.trace_level` (default `"info"`). With `config.trace_file` set, spans
/// are exported as OTLP JSON lines to that file through OpenTelemetry; without it,
/// events are printed to stderr.
///
/// Idempotent: only the first call has an effect, later calls return its result.
/// Never fails the host; if a subscriber is already installed or the trace
/// directory cannot be created, this returns `false`.
///
/// # Example
///
/// ```rust
/// use pagesync::observability::init_tracing;
/// use pagesync::Config;
///
/// let config = Config {
///     trace_level: Some("pagesync=debug".to_string()),
///     ..Default::default()
/// };
///
/// let first = init_tracing(&config);
/// assert_eq!(init_tracing(&config), first);
/// ```
pub fn init_tracing(config: &Config) -> bool {
    *INSTALLED.get_or_init(|| install(config))
}

fn install(config: &Config) -> bool {
    let level = config.trace_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let otel_layer = match config.trace_file.as_deref() {
        Some(path) => match otel_layer(path) {
            Ok(layer) => Some(layer),
            Err(e) => {
                eprintln!("pagesync: trace file {path} unavailable: {e}");
                return false;
            }
        },
        None => None,
    };
    let fmt_layer = otel_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

fn otel_layer<S>(
    path: &str,
) -> std::io::Result<OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let resource = Resource::new(vec![
        opentelemetry::KeyValue::new("service.name", SERVICE_NAME),
        opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);
    let provider = tracer::create_tracer_provider(path.to_path_buf(), resource);
    let tracer = provider.tracer(SERVICE_NAME);
    opentelemetry::global::set_tracer_provider(provider);

    Ok(OpenTelemetryLayer::new(tracer))
}
