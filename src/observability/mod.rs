//! OpenTelemetry-based observability with file-based trace export.
//!
//! Spans from `tracing` are bridged into OpenTelemetry and written as OTLP JSON
//! lines to a local, size-rotated file for offline analysis. Without a trace file
//! the crate logs human-readable events to stderr instead.
//!
//! # Architecture
//!
//! ```text
//! tracing-opentelemetry → OpenTelemetry SDK → JsonLinesExporter → rotated file
//! ```
//!
//! # Configuration
//!
//! Filter directives are resolved in this order:
//! 1. `RUST_LOG` environment variable
//! 2. `trace_level` in [`crate::Config`]
//! 3. Default: `"info"`
//!
//! # Modules
//!
//! - `init`: Subscriber setup
//! - `tracer`: Tracer provider with the JSON-lines exporter
//! - `span_formatter`: OTLP JSON encoding
//! - `file_writer`: Numbered size-based rotation

mod file_writer;
mod init;
mod span_formatter;
mod tracer;

pub use init::init_tracing;
