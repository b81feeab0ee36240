//! OpenTelemetry tracer provider exporting to a local JSON-lines file.

use super::file_writer::FileWriter;
use super::span_formatter::SpanFormatter;
use futures_util::future::BoxFuture;
use opentelemetry::trace::TraceError;
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::resource::Resource;
use opentelemetry_sdk::trace::TracerProvider;
use std::path::PathBuf;

/// Span exporter appending one OTLP JSON document per batch to a rotated file.
#[derive(Debug)]
struct JsonLinesExporter {
    writer: FileWriter,
    formatter: SpanFormatter,
    closed: bool,
}

impl JsonLinesExporter {
    fn new(path: PathBuf, resource: &Resource) -> Self {
        Self {
            writer: FileWriter::new(path),
            formatter: SpanFormatter::new(resource),
            closed: false,
        }
    }

    fn write(&self, batch: &[SpanData]) -> ExportResult {
        if self.closed {
            return Err(TraceError::from("trace exporter already shut down"));
        }

        let line = self
            .formatter
            .format_batch(batch)
            .map_err(|e| TraceError::from(e.to_string()))?;

        self.writer
            .write_line(&line)
            .map_err(|e| TraceError::from(format!("{}: {e}", self.writer.path().display())))
    }
}

impl SpanExporter for JsonLinesExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = self.write(&batch);
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self) {
        self.closed = true;
    }
}

/// Builds a provider whose spans are written synchronously to `path`.
pub fn create_tracer_provider(path: PathBuf, resource: Resource) -> TracerProvider {
    let exporter = JsonLinesExporter::new(path, &resource);

    TracerProvider::builder()
        .with_config(opentelemetry_sdk::trace::Config::default().with_resource(resource))
        .with_simple_exporter(exporter)
        .build()
}
