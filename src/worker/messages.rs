//! Fetch request and response types passed between the coordinator and fetch tasks.
//!
//! Every outgoing fetch is a [`FetchRequest`] tagged, at dispatch time, with the
//! equivalence-class key, the target page (inside its query) and a sequence number.
//! Completions come back as a [`FetchResponse`] carrying the same request, which is
//! what the coordinator compares against its current state to drop stale results.
//! Requests also carry the dispatching span's trace context so fetch spans running
//! on another task link back to their parent.

use crate::app::FetchKind;
use crate::domain::{ClassKey, PaginatedList, Query, Result};
use serde::{Deserialize, Serialize};

/// Distributed tracing context captured when a request is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// OpenTelemetry trace ID as a hex string.
    pub trace_id: String,

    /// Span ID of the dispatching span, as a hex string.
    pub parent_span_id: String,
}

impl TraceContext {
    /// Captures the OpenTelemetry IDs of the current tracing span.
    ///
    /// Returns `None` when no OpenTelemetry layer is installed or the span is not
    /// sampled.
    pub fn from_current() -> Option<Self> {
        use opentelemetry::trace::TraceContextExt;
        use tracing_opentelemetry::OpenTelemetrySpanExt;

        let otel_context = tracing::Span::current().context();
        let span_ref = otel_context.span();
        let span_context = span_ref.span_context();

        if !span_context.is_valid() {
            return None;
        }

        Some(Self {
            trace_id: format!("{:032x}", span_context.trace_id()),
            parent_span_id: format!("{:016x}", span_context.span_id()),
        })
    }

    /// Rebuilds a remote OpenTelemetry context to parent spans on the fetch task.
    ///
    /// Returns `None` if either ID fails to parse.
    #[must_use]
    pub fn to_otel_context(&self) -> Option<opentelemetry::Context> {
        use opentelemetry::trace::{
            SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState,
        };

        let trace_id = TraceId::from_hex(&self.trace_id).ok()?;
        let span_id = SpanId::from_hex(&self.parent_span_id).ok()?;

        let span_context = SpanContext::new(
            trace_id,
            span_id,
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );

        Some(opentelemetry::Context::new().with_remote_span_context(span_context))
    }
}

/// A fetch of record, tagged at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Monotonic dispatch number within one coordinator.
    pub seq: u64,

    /// Equivalence class the request was dispatched for.
    pub class: ClassKey,

    /// Why the request was issued.
    pub kind: FetchKind,

    /// Query sent to the service, with `page` set to the target page.
    pub query: Query,

    /// Trace context of the dispatching span.
    pub trace_context: Option<TraceContext>,
}

impl FetchRequest {
    /// Creates a request and captures the current trace context.
    #[must_use]
    pub fn new(seq: u64, class: ClassKey, kind: FetchKind, query: Query) -> Self {
        Self {
            seq,
            class,
            kind,
            query,
            trace_context: TraceContext::from_current(),
        }
    }

    /// Page this request targets.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.query.page
    }

    /// Returns `true` if a successful result is appended.
    #[must_use]
    pub const fn is_load_more(&self) -> bool {
        self.kind.is_load_more()
    }
}

/// Completion of a [`FetchRequest`].
#[derive(Debug, Clone)]
pub struct FetchResponse<T> {
    /// The request as it was dispatched.
    pub request: FetchRequest,

    /// Page on success; transport and service failures alike on error.
    pub outcome: Result<PaginatedList<T>>,
}
