//! # vecgraph-telemetry
//!
//! Logging setup for vecgraph services and in-memory capture of search
//! spans.
//!
//! ```rust,no_run
//! vecgraph_telemetry::init_telemetry("hybrid-search").ok();
//! tracing::info!("ready");
//! ```
//!
//! The log level comes from `RUST_LOG` and defaults to `info`.

pub mod memory;

use std::sync::Arc;

use tracing::Subscriber;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

pub use memory::{SEARCH_ID_FIELD, SearchTraceLayer, SharedTraceStorage, SpanData, SpanStatus};

// Re-export the macros so callers need a single dependency.
pub use tracing::{Span, debug, error, info, instrument, trace, warn};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global human-readable subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_telemetry(service_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .try_init()?;
    tracing::info!(service.name = service_name, "telemetry initialized");
    Ok(())
}

/// Install a global subscriber that writes one JSON object per line.
pub fn init_json_telemetry(service_name: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_current_span(true).with_span_list(true))
        .try_init()?;
    tracing::info!(service.name = service_name, "telemetry initialized");
    Ok(())
}

/// Install a global subscriber that logs like [`init_telemetry`] and also
/// captures search spans into `storage`.
///
/// The layer lives for the rest of the process. Give it a storage built with
/// [`SharedTraceStorage::with_max_searches`] or call
/// [`SharedTraceStorage::clear`] periodically.
pub fn init_with_storage(
    service_name: &str,
    storage: Arc<SharedTraceStorage>,
) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true))
        .with(SearchTraceLayer::new(storage))
        .try_init()?;
    tracing::info!(service.name = service_name, "telemetry initialized with trace storage");
    Ok(())
}

/// A subscriber that only captures search spans, for use with
/// [`tracing::subscriber::set_default`] or
/// [`tracing::subscriber::with_default`].
pub fn capture_subscriber(storage: Arc<SharedTraceStorage>) -> impl Subscriber + Send + Sync {
    tracing_subscriber::registry().with(SearchTraceLayer::new(storage))
}
