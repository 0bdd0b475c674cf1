/*!
 * Structured Tracing
 * Subscriber setup plus timing spans for ingest requests and resolution tasks
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

use crate::core::types::{AppId, EventId};

/// Ingest requests slower than this get flagged; the ingest path is the
/// latency contract of the whole service
const SLOW_INGEST_MS: u128 = 50;
/// Resolution runs off the hot path, so the bar is looser
const SLOW_RESOLVE_MS: u128 = 250;

/// Initialize structured tracing
///
/// Environment variables:
/// - `RUST_LOG`: filter directives (default: info)
/// - `ARGUS_TRACE_JSON`: enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("ARGUS_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
        info!("tracing initialized with JSON output");
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .init();
        info!("tracing initialized");
    }
}

/// Generate a unique trace id for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one ingest request
///
/// Carries the trace id through every log line the pipeline emits for the
/// request; dropping it logs the wall time, with slow requests flagged.
pub struct IngestSpan {
    span: tracing::Span,
    start: Instant,
    trace_id: String,
}

impl IngestSpan {
    pub fn new(app_id: AppId, batch: bool) -> Self {
        let trace_id = generate_trace_id();
        let span = span!(
            Level::DEBUG,
            "ingest",
            trace_id = %trace_id,
            app_id,
            batch,
            outcome = tracing::field::Empty,
            events = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Record the terminal outcome tag (`accepted`, `deduplicated`, ...)
    pub fn record_outcome(&self, outcome: &str) {
        self.span.record("outcome", outcome);
    }

    /// Record how many events the request carried
    pub fn record_events(&self, count: usize) {
        self.span.record("events", count);
    }

    /// Enter the span so nested pipeline logs attach to it
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for IngestSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();

        if elapsed.as_millis() > SLOW_INGEST_MS {
            warn!(
                trace_id = %self.trace_id,
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "slow ingest request"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                duration_us = elapsed.as_micros() as u64,
                "ingest request completed"
            );
        }
    }
}

/// Span covering one resolution task attempt
pub struct ResolveSpan {
    span: tracing::Span,
    start: Instant,
}

impl ResolveSpan {
    pub fn new(event_id: EventId, attempt: u32) -> Self {
        let span = span!(
            Level::DEBUG,
            "resolve",
            event_id = %event_id,
            attempt,
            result = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
        }
    }

    /// Record the attempt result (`resolved`, `retried`, `failed`)
    pub fn record_result(&self, result: &str) {
        self.span.record("result", result);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for ResolveSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();

        if elapsed.as_millis() > SLOW_RESOLVE_MS {
            warn!(
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "slow resolution task"
            );
        } else {
            debug!(
                duration_us = elapsed.as_micros() as u64,
                "resolution task completed"
            );
        }
    }
}
