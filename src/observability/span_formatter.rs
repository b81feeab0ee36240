//! OTLP JSON encoding of exported spans.
//!
//! Each export batch becomes one `ExportTraceServiceRequest` document in the
//! OTLP/JSON mapping: IDs as lowercase hex, timestamps as decimal nanosecond
//! strings, 64-bit integers as strings, and enums as their integer codes.

use opentelemetry::trace::{Event, Link, SpanId, SpanKind, Status};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::resource::Resource;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Instrumentation scope recorded on every batch.
const SCOPE_NAME: &str = "pagesync";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest {
    resource_spans: Vec<ResourceSpans>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceSpans {
    resource: OtlpResource,
    scope_spans: Vec<ScopeSpans>,
}

#[derive(Serialize)]
struct OtlpResource {
    attributes: Vec<Attribute>,
}

#[derive(Serialize)]
struct Scope {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScopeSpans {
    scope: Scope,
    spans: Vec<OtlpSpan>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OtlpSpan {
    trace_id: String,
    span_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    parent_span_id: String,
    name: String,
    kind: u8,
    start_time_unix_nano: String,
    end_time_unix_nano: String,
    attributes: Vec<Attribute>,
    events: Vec<OtlpEvent>,
    links: Vec<OtlpLink>,
    status: OtlpStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OtlpEvent {
    time_unix_nano: String,
    name: String,
    attributes: Vec<Attribute>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OtlpLink {
    trace_id: String,
    span_id: String,
    attributes: Vec<Attribute>,
}

#[derive(Serialize)]
struct OtlpStatus {
    code: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    message: String,
}

#[derive(Clone, Serialize)]
struct Attribute {
    key: String,
    value: AnyValue,
}

#[derive(Clone, Serialize)]
enum AnyValue {
    #[serde(rename = "boolValue")]
    Bool(bool),
    #[serde(rename = "intValue")]
    Int(String),
    #[serde(rename = "doubleValue")]
    Double(f64),
    #[serde(rename = "stringValue")]
    String(String),
}

/// Encodes span batches as OTLP JSON lines.
pub struct SpanFormatter {
    resource: Vec<Attribute>,
}

impl SpanFormatter {
    /// Creates a formatter stamping `resource` on every batch.
    pub fn new(resource: &Resource) -> Self {
        let resource = resource
            .iter()
            .map(|(key, value)| Attribute {
                key: key.to_string(),
                value: any_value(value),
            })
            .collect();
        Self { resource }
    }

    /// Encodes `batch` as a single-line JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn format_batch(&self, batch: &[SpanData]) -> serde_json::Result<String> {
        let request = ExportRequest {
            resource_spans: vec![ResourceSpans {
                resource: OtlpResource {
                    attributes: self.resource.clone(),
                },
                scope_spans: vec![ScopeSpans {
                    scope: Scope {
                        name: SCOPE_NAME,
                        version: env!("CARGO_PKG_VERSION"),
                    },
                    spans: batch.iter().map(encode_span).collect(),
                }],
            }],
        };
        serde_json::to_string(&request)
    }
}

impl std::fmt::Debug for SpanFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanFormatter")
            .field("resource_attributes", &self.resource.len())
            .finish()
    }
}

fn encode_span(span: &SpanData) -> OtlpSpan {
    let parent_span_id = if span.parent_span_id == SpanId::INVALID {
        String::new()
    } else {
        format!("{:016x}", span.parent_span_id)
    };
    let (code, message) = status(&span.status);

    OtlpSpan {
        trace_id: format!("{:032x}", span.span_context.trace_id()),
        span_id: format!("{:016x}", span.span_context.span_id()),
        parent_span_id,
        name: span.name.to_string(),
        kind: kind_code(&span.span_kind),
        start_time_unix_nano: unix_nanos(span.start_time),
        end_time_unix_nano: unix_nanos(span.end_time),
        attributes: attributes(&span.attributes),
        events: span.events.iter().map(encode_event).collect(),
        links: span.links.iter().map(encode_link).collect(),
        status: OtlpStatus { code, message },
    }
}

fn encode_event(event: &Event) -> OtlpEvent {
    OtlpEvent {
        time_unix_nano: unix_nanos(event.timestamp),
        name: event.name.to_string(),
        attributes: attributes(&event.attributes),
    }
}

fn encode_link(link: &Link) -> OtlpLink {
    OtlpLink {
        trace_id: format!("{:032x}", link.span_context.trace_id()),
        span_id: format!("{:016x}", link.span_context.span_id()),
        attributes: attributes(&link.attributes),
    }
}

fn attributes(values: &[KeyValue]) -> Vec<Attribute> {
    values
        .iter()
        .map(|kv| Attribute {
            key: kv.key.to_string(),
            value: any_value(&kv.value),
        })
        .collect()
}

fn any_value(value: &Value) -> AnyValue {
    match value {
        Value::Bool(b) => AnyValue::Bool(*b),
        Value::I64(i) => AnyValue::Int(i.to_string()),
        Value::F64(f) => AnyValue::Double(*f),
        Value::String(s) => AnyValue::String(s.to_string()),
        Value::Array(_) => AnyValue::String(value.to_string()),
    }
}

const fn kind_code(kind: &SpanKind) -> u8 {
    match kind {
        SpanKind::Internal => 1,
        SpanKind::Server => 2,
        SpanKind::Client => 3,
        SpanKind::Producer => 4,
        SpanKind::Consumer => 5,
    }
}

fn status(status: &Status) -> (u8, String) {
    match status {
        Status::Unset => (0, String::new()),
        Status::Ok => (1, String::new()),
        Status::Error { description } => (2, description.to_string()),
    }
}

fn unix_nanos(time: SystemTime) -> String {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
        .to_string()
}
