/*!
 * Deduplication Abstraction
 * Window-counter contract the ingest path records occurrences through
 */

use crate::core::types::{AppId, EventId, Fingerprint, TimestampMs};
use serde::{Deserialize, Serialize};

/// Outcome of recording one occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupDecision {
    /// True when this occurrence opened a window; the caller persists a row
    /// only then
    pub is_new_window: bool,
    /// Occurrences seen in the current window, this one included
    pub count: u64,
    /// Event id bound to the window: the candidate on a new window, the
    /// first occurrence's id on a duplicate
    pub event_id: EventId,
}

/// Point-in-time dedup statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupStats {
    /// Live window entries
    pub entries: usize,
    /// Occurrences that opened a window
    pub windows_opened: u64,
    /// Occurrences folded into an existing window
    pub duplicates: u64,
}

/// Sliding-window occurrence counter keyed by `(app_id, fingerprint)`
///
/// Implementations must serialize concurrent occurrences for the same key:
/// two simultaneous calls must observe distinct counts and agree on the
/// bound event id.
pub trait DedupStore: Send + Sync {
    /// Record one occurrence at `now`, with `candidate` as the event id to
    /// bind if this occurrence opens a new window
    fn record_occurrence(
        &self,
        app_id: AppId,
        fingerprint: &Fingerprint,
        now: TimestampMs,
        candidate: EventId,
    ) -> DedupDecision;

    /// Point-in-time statistics
    fn stats(&self) -> DedupStats;

    /// Backend name for diagnostics
    fn name(&self) -> &str;
}
