/*!
 * API Types
 * Response shapes, query parameters, and the HTTP error mapping
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::data_structures::InlineString;
use crate::core::errors::{ArgusError, IngestError, SerializableError, SourceMapError, StoreError};
use crate::core::types::{AppId, Release, RuntimeInfo, TimestampMs};
use crate::dedup::DedupStats;
use crate::event::types::{EventKind, StoredEvent};
use crate::event::StoreStats;
use crate::pipeline::PipelineStats;
use crate::queue::{QueueStats, WorkerStats};
use crate::replay::{CorrelatorStats, StoredReplay};
use crate::sourcemap::RegistryStats;
use crate::spike::SpikeStats;
use crate::stream::StreamStats;

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// An HTTP failure: status code plus the serializable error body
///
/// Every fallible handler returns this on the error arm so clients always
/// see the same `{"error": {...}}` shape regardless of which layer failed.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: SerializableError,
}

impl ApiError {
    pub fn new(status: StatusCode, error: SerializableError) -> Self {
        Self { status, error }
    }

    pub fn not_found(message: impl Into<InlineString>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            SerializableError::new("not_found", message),
        )
    }

    pub fn bad_request(message: impl Into<InlineString>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            SerializableError::new("bad_request", message),
        )
    }
}

/// Wire shape for error responses
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: SerializableError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.error })).into_response()
    }
}

impl From<ArgusError> for ApiError {
    fn from(err: ArgusError) -> Self {
        let status = match &err {
            ArgusError::Ingest(IngestError::PayloadTooLarge { .. })
            | ArgusError::Ingest(IngestError::BatchTooLarge { .. })
            | ArgusError::SourceMap(SourceMapError::TooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ArgusError::Ingest(_) | ArgusError::SourceMap(_) => StatusCode::BAD_REQUEST,
            ArgusError::Store(StoreError::EventNotFound(_))
            | ArgusError::Store(StoreError::ReplayNotFound(_)) => StatusCode::NOT_FOUND,
            ArgusError::Store(StoreError::Unavailable(_)) | ArgusError::Queue(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ArgusError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.into())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        ArgusError::from(err).into()
    }
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// `appId` scope shared by the replay and stream routes
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AppScope {
    #[serde(rename = "appId")]
    pub app_id: AppId,
}

/// Filters for the recent-events listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQuery {
    pub kind: Option<EventKind>,
    pub fingerprint: Option<String>,
    /// Inclusive lower bound on `received_at`, epoch milliseconds
    pub since: Option<TimestampMs>,
    /// Inclusive upper bound on `received_at`, epoch milliseconds
    pub until: Option<TimestampMs>,
    pub limit: Option<usize>,
}

// =============================================================================
// RESPONSE BODIES
// =============================================================================

/// Aggregated diagnostics for the health endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub runtime: RuntimeInfo,
    pub pipeline: PipelineStats,
    pub store: StoreStats,
    pub dedup: DedupStats,
    pub queue: QueueStats,
    pub workers: WorkerStats,
    pub sourcemaps: RegistryStats,
    pub stream: StreamStats,
    pub spikes: SpikeStats,
    pub correlator: CorrelatorStats,
}

/// A stored replay together with the errors that reference it
#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    pub replay: StoredReplay,
    /// Timestamp ascending, so playback can seek to each error in order
    pub related_errors: Vec<StoredEvent>,
}

/// Acknowledgement for a stored source map artifact
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub release: Release,
    pub file: String,
    pub size: usize,
}
