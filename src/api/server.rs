/*!
 * HTTP Server
 * Axum router, request handlers, and graceful shutdown
 *
 * Thin layer over the pipeline components: handlers validate the request
 * shape, delegate, and map outcomes onto status codes. No business rules
 * live here.
 */

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

use crate::core::errors::{IngestError, Result};
use crate::core::limits::MAX_SOURCEMAP_BYTES;
use crate::core::types::{now_ms, AppId, ReplayId, RuntimeInfo, TimestampMs};
use crate::dedup::DedupStore;
use crate::event::types::{EventFilter, EventSummary, StoredEvent};
use crate::event::EventStore;
use crate::observe::IngestSpan;
use crate::pipeline::{IngestOutcome, IngestPipeline};
use crate::queue::{TaskQueue, WorkerPool};
use crate::replay::ReplayCorrelator;
use crate::sourcemap::{SourceMapMeta, SourceMapRegistry};
use crate::spike::{SpikeAlert, SpikeDetector};
use crate::stream::{StreamRegistry, Topic};

use super::types::{
    ApiError, AppScope, EventsQuery, HealthResponse, ReplayResponse, UploadResponse,
};

/// Default page size for the recent-events listing
const RECENT_EVENTS_LIMIT: usize = 100;

// =============================================================================
// STATE & ROUTER
// =============================================================================

/// Shared component handles for all request handlers
pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub store: Arc<dyn EventStore>,
    pub dedup: Arc<dyn DedupStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub workers: Arc<WorkerPool>,
    pub sourcemaps: Arc<SourceMapRegistry>,
    pub correlator: Arc<ReplayCorrelator>,
    pub spikes: Arc<SpikeDetector>,
    pub stream: Arc<StreamRegistry>,
    pub started_at_ms: TimestampMs,
}

/// Build the API router
///
/// The body limit is raised to the source map budget, the largest payload
/// any route accepts; per-route budgets are enforced inside the pipeline.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/monitoring/:app_id", post(ingest_event))
        .route("/monitoring/:app_id/batch", post(ingest_batch))
        .route("/sourcemaps/upload", post(upload_sourcemap))
        .route("/sourcemaps/:app_id", get(list_sourcemaps))
        .route("/events/:app_id", get(list_events))
        .route("/spikes/:app_id", get(list_spikes))
        .route("/replays/:replay_id", get(get_replay))
        .route("/replays/:replay_id/errors", get(get_replay_errors))
        .route("/stream/:topic", get(stream_topic))
        .layer(DefaultBodyLimit::max(MAX_SOURCEMAP_BYTES))
        .with_state(state)
}

/// Serve the API until a shutdown signal arrives
pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "argusd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => tracing::error!(error = %err, "shutdown handler failed; stopping server"),
    }
}

// =============================================================================
// INGESTION
// =============================================================================

/// `POST /monitoring/:app_id`: one event envelope
async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<AppId>,
    body: Bytes,
) -> std::result::Result<(StatusCode, Json<IngestOutcome>), ApiError> {
    let span = IngestSpan::new(app_id, false);
    let outcome = {
        let _guard = span.enter();
        state.pipeline.ingest(app_id, &body)
    }?;
    span.record_outcome(outcome.status());
    Ok((StatusCode::ACCEPTED, Json(outcome)))
}

/// `POST /monitoring/:app_id/batch`: several envelopes, one outcome each
async fn ingest_batch(
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<AppId>,
    body: Bytes,
) -> std::result::Result<(StatusCode, Json<Vec<IngestOutcome>>), ApiError> {
    let span = IngestSpan::new(app_id, true);
    let outcomes = {
        let _guard = span.enter();
        state.pipeline.ingest_batch(app_id, &body)
    }?;
    span.record_events(outcomes.len());
    Ok((StatusCode::ACCEPTED, Json(outcomes)))
}

// =============================================================================
// SOURCE MAPS
// =============================================================================

/// `POST /sourcemaps/upload`: multipart artifact upload
///
/// Fields: `file` (the map, with its artifact file name), `release`,
/// `appId`, optional `urlPrefix`. Unknown fields are ignored so SDK
/// uploaders can add metadata without breaking older servers.
async fn upload_sourcemap(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> std::result::Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut release: Option<String> = None;
    let mut app_id: Option<AppId> = None;
    let mut url_prefix: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| IngestError::Malformed(format!("multipart: {err}").into()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or_default().to_string();
                let body = field
                    .bytes()
                    .await
                    .map_err(|err| IngestError::Malformed(format!("multipart: {err}").into()))?;
                file = Some((name, body));
            }
            "release" => release = Some(read_text_field(field).await?),
            "appId" => {
                let text = read_text_field(field).await?;
                let parsed = text
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::bad_request("appId must be a number"))?;
                app_id = Some(parsed);
            }
            "urlPrefix" => url_prefix = Some(read_text_field(field).await?),
            _ => {}
        }
    }

    let (name, body) = file.ok_or(IngestError::MissingField("file".into()))?;
    let release = release.ok_or(IngestError::MissingField("release".into()))?;
    let app_id = app_id.ok_or(IngestError::MissingField("appId".into()))?;
    if name.is_empty() {
        return Err(IngestError::MissingField("file name".into()).into());
    }

    let size = body.len();
    state
        .sourcemaps
        .store(app_id, &release, &name, url_prefix, body)
        .map_err(crate::core::errors::ArgusError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            release,
            file: name,
            size,
        }),
    ))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> std::result::Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|err| IngestError::Malformed(format!("multipart: {err}").into()).into())
}

/// `GET /sourcemaps/:app_id`: uploaded artifacts for an app
async fn list_sourcemaps(
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<AppId>,
) -> Json<Vec<SourceMapMeta>> {
    Json(state.sourcemaps.list(app_id))
}

// =============================================================================
// READS
// =============================================================================

/// `GET /events/:app_id`: recent events, newest first
async fn list_events(
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<AppId>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventSummary>> {
    let mut filter = EventFilter::new().limit(query.limit.unwrap_or(RECENT_EVENTS_LIMIT));
    if let Some(kind) = query.kind {
        filter = filter.kind(kind);
    }
    if let Some(fingerprint) = query.fingerprint {
        filter = filter.fingerprint(fingerprint);
    }
    if let Some(since) = query.since {
        filter = filter.since(since);
    }
    if let Some(until) = query.until {
        filter = filter.until(until);
    }
    // Condensed rows: listings never ship stack bodies
    let events = state
        .store
        .recent_events(app_id, &filter)
        .iter()
        .map(StoredEvent::summary)
        .collect();
    Json(events)
}

/// `GET /spikes/:app_id`: alerts live as of the last detector evaluation
async fn list_spikes(
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<AppId>,
) -> Json<Vec<SpikeAlert>> {
    let snapshot = state.spikes.current();
    let alerts = snapshot
        .alerts
        .iter()
        .filter(|alert| alert.app_id == app_id)
        .cloned()
        .collect();
    Json(alerts)
}

/// `GET /replays/:replay_id?appId=`: replay body plus its related errors
///
/// A miss waits out the correlator's single retry before reporting 404,
/// covering uploads that lag the errors referencing them.
async fn get_replay(
    State(state): State<Arc<AppState>>,
    Path(replay_id): Path<ReplayId>,
    Query(scope): Query<AppScope>,
) -> std::result::Result<Json<ReplayResponse>, ApiError> {
    let replay = state
        .correlator
        .get_replay(&replay_id, scope.app_id, true)
        .await
        .ok_or_else(|| ApiError::not_found(format!("replay not found: {replay_id}")))?;

    let related_errors = state.correlator.related_errors(&replay_id, scope.app_id);
    Ok(Json(ReplayResponse {
        replay,
        related_errors,
    }))
}

/// `GET /replays/:replay_id/errors?appId=`: related errors only
///
/// Returns an empty list when nothing references the replay; absence of
/// the replay record itself is not an error here.
async fn get_replay_errors(
    State(state): State<Arc<AppState>>,
    Path(replay_id): Path<ReplayId>,
    Query(scope): Query<AppScope>,
) -> Json<Vec<StoredEvent>> {
    Json(state.correlator.related_errors(&replay_id, scope.app_id))
}

// =============================================================================
// LIVE STREAM
// =============================================================================

/// `GET /stream/:topic?appId=`: long-lived SSE feed for one app topic
///
/// Each pushed message and each heartbeat becomes one SSE data frame; the
/// subscription is detached when the client goes away and the response
/// stream is dropped.
async fn stream_topic(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Query(scope): Query<AppScope>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, ApiError>
{
    let topic: Topic = topic
        .parse()
        .map_err(|_| ApiError::bad_request(format!("unknown stream topic: {topic}")))?;

    let subscription = state.stream.subscribe(scope.app_id, topic);
    info!(
        app_id = scope.app_id,
        topic = %topic,
        subscriber = %subscription.id(),
        "stream subscriber connected"
    );

    let stream = async_stream::stream! {
        while let Some(frame) = subscription.recv().await {
            yield Ok(Event::default().data(frame.as_str()));
        }
    };
    Ok(Sse::new(stream))
}

// =============================================================================
// HEALTH
// =============================================================================

/// `GET /health`: read-only diagnostics across every component
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let uptime_secs = now_ms().saturating_sub(state.started_at_ms) / 1000;
    Json(HealthResponse {
        status: "ok",
        runtime: RuntimeInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at_ms: state.started_at_ms,
            uptime_secs,
        },
        pipeline: state.pipeline.stats(),
        store: state.store.stats(),
        dedup: state.dedup.stats(),
        queue: state.queue.stats(),
        workers: state.workers.stats(),
        sourcemaps: state.sourcemaps.stats(),
        stream: state.stream.stats(),
        spikes: state.spikes.stats(),
        correlator: state.correlator.stats(),
    })
}
