//! In-memory span capture keyed by search id.
//!
//! [`SearchTraceLayer`] records every closed span that carries a
//! `search.id` field, either directly or inherited from an ancestor span,
//! into a [`SharedTraceStorage`]. Spans outside any search are ignored.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{Id, Level, Subscriber};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

/// Field that groups spans into one trace.
pub const SEARCH_ID_FIELD: &str = "search.id";

/// Data for a captured span
#[derive(Debug, Clone, Serialize)]
pub struct SpanData {
    #[serde(rename = "span_id")]
    pub id: String,
    pub search_id: String,
    pub name: String,
    #[serde(rename = "parent_span_id", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Nanoseconds since the Unix epoch.
    pub start_time: u128,
    pub end_time: u128,

    pub attributes: HashMap<String, serde_json::Value>,
    pub status: SpanStatus,
}

impl SpanData {
    /// Duration of the span in nanoseconds.
    pub fn duration_nanos(&self) -> u128 {
        self.end_time.saturating_sub(self.start_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanStatus {
    // 0=Unset, 1=Ok, 2=Error
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SpanStatus {
    pub fn is_error(&self) -> bool {
        self.code == 2
    }
}

#[derive(Debug, Default)]
struct Traces {
    by_search: HashMap<String, Vec<SpanData>>,
    /// Search ids in first-seen order, oldest first.
    order: VecDeque<String>,
}

/// Shared storage for traces
///
/// Unbounded by default. A storage installed for the whole process should
/// be built with [`SharedTraceStorage::with_max_searches`], or drained with
/// [`SharedTraceStorage::clear`], since every search adds one trace.
#[derive(Debug, Clone, Default)]
pub struct SharedTraceStorage {
    traces: Arc<RwLock<Traces>>,
    max_searches: Option<usize>,
}

impl SharedTraceStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_searches` traces, evicting the oldest search first.
    pub fn with_max_searches(max_searches: usize) -> Self {
        Self { traces: Arc::default(), max_searches: Some(max_searches.max(1)) }
    }

    pub fn get_trace(&self, search_id: &str) -> Option<Vec<SpanData>> {
        self.traces.read().ok()?.by_search.get(search_id).cloned()
    }

    pub fn add_span(&self, search_id: String, span: SpanData) {
        let Ok(mut traces) = self.traces.write() else { return };
        if !traces.by_search.contains_key(&search_id) {
            traces.order.push_back(search_id.clone());
        }
        traces.by_search.entry(search_id).or_default().push(span);

        if let Some(max) = self.max_searches {
            while traces.order.len() > max {
                if let Some(oldest) = traces.order.pop_front() {
                    traces.by_search.remove(&oldest);
                }
            }
        }
    }

    /// Ids of every search with at least one captured span, oldest first.
    pub fn search_ids(&self) -> Vec<String> {
        self.traces.read().map(|t| t.order.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut traces) = self.traces.write() {
            traces.by_search.clear();
            traces.order.clear();
        }
    }
}

/// A tracing layer that captures search spans in memory
pub struct SearchTraceLayer {
    storage: Arc<SharedTraceStorage>,
}

impl SearchTraceLayer {
    pub fn new(storage: Arc<SharedTraceStorage>) -> Self {
        Self { storage }
    }
}

#[derive(Clone)]
struct SpanFields(HashMap<String, serde_json::Value>);

struct StartTime(u128);

/// Message of the first error event emitted inside a span.
struct SpanError(String);

fn now_nanos() -> u128 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_nanos()
}

impl<S> Layer<S> for SearchTraceLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        let mut fields = visitor.0;

        // Inherit the search id unless the span sets its own.
        if !fields.contains_key(SEARCH_ID_FIELD) {
            if let Some(parent) = span.parent() {
                if let Some(val) = parent
                    .extensions()
                    .get::<SpanFields>()
                    .and_then(|f| f.0.get(SEARCH_ID_FIELD).cloned())
                {
                    fields.insert(SEARCH_ID_FIELD.to_string(), val);
                }
            }
        }

        let mut extensions = span.extensions_mut();
        extensions.insert(StartTime(now_nanos()));
        extensions.insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let Some(span) = ctx.event_span(event) else { return };

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let message = visitor
            .0
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("error")
            .to_string();

        let mut extensions = span.extensions_mut();
        if extensions.get_mut::<SpanError>().is_none() {
            extensions.insert(SpanError(message));
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let extensions = span.extensions();

        let fields = extensions.get::<SpanFields>().map(|f| f.0.clone()).unwrap_or_default();
        let Some(search_id) =
            fields.get(SEARCH_ID_FIELD).and_then(|v| v.as_str()).map(str::to_string)
        else {
            return;
        };

        let status = match extensions.get::<SpanError>() {
            Some(SpanError(message)) => SpanStatus { code: 2, message: Some(message.clone()) },
            None => SpanStatus { code: 1, message: None },
        };

        let span_data = SpanData {
            id: format!("{:016x}", id.into_u64()),
            search_id: search_id.clone(),
            name: span.metadata().name().to_string(),
            parent_id: span.parent().map(|p| format!("{:016x}", p.id().into_u64())),
            start_time: extensions.get::<StartTime>().map(|s| s.0).unwrap_or(0),
            end_time: now_nanos(),
            attributes: fields,
            status,
        };

        self.storage.add_span(search_id, span_data);
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, serde_json::Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
