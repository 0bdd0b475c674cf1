/*!
 * Event Store Abstraction
 * Storage trait the pipeline persists through
 */

use crate::core::data_structures::InlineString;
use crate::core::types::{AppId, EventId, Fingerprint, ReplayId, TimestampMs};
use crate::event::types::{EventFilter, ResolutionStatus, StoredEvent};
use crate::replay::types::StoredReplay;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-related errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum StoreError {
    #[error("Event {0} not found")]
    #[diagnostic(
        code(store::event_not_found),
        help("The event may have been evicted or the id is stale.")
    )]
    EventNotFound(EventId),

    #[error("Replay {0} not found")]
    #[diagnostic(
        code(store::replay_not_found),
        help("The replay upload may still be in flight or was never sent.")
    )]
    ReplayNotFound(InlineString),

    #[error("Store unavailable: {0}")]
    #[diagnostic(
        code(store::unavailable),
        help("The storage backend rejected the operation. Check backend health.")
    )]
    Unavailable(InlineString),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Point-in-time store statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub events: u64,
    pub replays: u64,
    /// Occurrences folded into existing rows instead of new inserts
    pub dedup_folds: u64,
}

/// Event storage backend
///
/// All storage implementations must implement this trait. Writes must be
/// atomic per row; window queries are half-open `[since, until)` over
/// server receive time.
pub trait EventStore: Send + Sync {
    /// Persist a new event row
    fn insert_event(&self, event: StoredEvent) -> StoreResult<()>;

    /// Fetch one event by id
    fn get_event(&self, id: EventId) -> StoreResult<StoredEvent>;

    /// Apply the dedup window's running count to a row, returning the stored
    /// count
    ///
    /// Counts only move up: a write below the stored value is ignored, so
    /// out-of-order applications from a concurrent burst cannot shrink it.
    fn update_dedup_count(&self, id: EventId, count: u64) -> StoreResult<u64>;

    /// Record the outcome of stack resolution for an event
    fn update_resolution(
        &self,
        id: EventId,
        status: ResolutionStatus,
        resolved_stack: Option<String>,
    ) -> StoreResult<()>;

    /// Recent events for an app, newest first
    fn recent_events(&self, app_id: AppId, filter: &EventFilter) -> Vec<StoredEvent>;

    /// Total occurrences (dedup counts included) of a fingerprint in a window
    fn count_occurrences(
        &self,
        app_id: AppId,
        fingerprint: &Fingerprint,
        since_ms: TimestampMs,
        until_ms: TimestampMs,
    ) -> u64;

    /// Distinct error fingerprints seen for an app in a window
    fn fingerprints_active(
        &self,
        app_id: AppId,
        since_ms: TimestampMs,
        until_ms: TimestampMs,
    ) -> Vec<Fingerprint>;

    /// Apps with any error activity since the given time
    fn apps_active(&self, since_ms: TimestampMs) -> Vec<AppId>;

    /// Error events that reference a replay, timestamp ascending
    fn events_by_replay(&self, replay_id: &ReplayId, limit: usize) -> Vec<StoredEvent>;

    /// Persist a replay (last write wins per id)
    fn put_replay(&self, replay: StoredReplay) -> StoreResult<()>;

    /// Fetch a replay by id
    fn get_replay(&self, replay_id: &ReplayId) -> Option<StoredReplay>;

    /// Point-in-time statistics
    fn stats(&self) -> StoreStats;

    /// Backend name for diagnostics
    fn name(&self) -> &str;
}
