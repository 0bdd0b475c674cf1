/*!
 * Replay Types
 * Stored rrweb recordings and their structural validity
 */

use crate::core::types::{AppId, ReplayId, SessionId, TimestampMs};
use serde::{Deserialize, Serialize};

/// rrweb event type carrying a full DOM snapshot
pub const FULL_SNAPSHOT_TYPE: i64 = 2;
/// rrweb event type carrying recording metadata (viewport, href)
pub const META_TYPE: i64 = 4;

/// A stored session replay
///
/// Created once when the upload is ingested and never mutated. The frame
/// body is kept as parsed JSON so playback requests return it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReplay {
    pub id: ReplayId,
    pub app_id: AppId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Declared by the SDK, or counted from the frame array
    pub event_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_timestamp: Option<TimestampMs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<TimestampMs>,
    pub has_full_snapshot: bool,
    pub has_meta: bool,
    pub received_at: TimestampMs,
    /// Ordered rrweb frames as uploaded
    pub events: serde_json::Value,
}

impl StoredReplay {
    /// Build a replay record from an uploaded frame array
    ///
    /// Scans the frames once for the structural sentinels and the time
    /// bounds. Declared totals win over derived ones when the SDK sent
    /// them; a missing duration falls back to last-minus-first timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn from_frames(
        id: ReplayId,
        app_id: AppId,
        session_id: Option<SessionId>,
        events: serde_json::Value,
        declared_count: Option<u64>,
        declared_duration_ms: Option<u64>,
        received_at: TimestampMs,
    ) -> Self {
        let mut has_full_snapshot = false;
        let mut has_meta = false;
        let mut first_timestamp = None;
        let mut last_timestamp = None;
        let mut frame_count = 0u64;

        if let Some(frames) = events.as_array() {
            frame_count = frames.len() as u64;
            for frame in frames {
                match frame.get("type").and_then(serde_json::Value::as_i64) {
                    Some(FULL_SNAPSHOT_TYPE) => has_full_snapshot = true,
                    Some(META_TYPE) => has_meta = true,
                    _ => {}
                }
                if let Some(ts) = frame.get("timestamp").and_then(serde_json::Value::as_u64) {
                    first_timestamp = Some(first_timestamp.map_or(ts, |f: u64| f.min(ts)));
                    last_timestamp = Some(last_timestamp.map_or(ts, |l: u64| l.max(ts)));
                }
            }
        }

        let duration_ms = declared_duration_ms.or(match (first_timestamp, last_timestamp) {
            (Some(first), Some(last)) => Some(last - first),
            _ => None,
        });

        Self {
            id,
            app_id,
            session_id,
            event_count: declared_count.unwrap_or(frame_count),
            duration_ms,
            first_timestamp,
            last_timestamp,
            has_full_snapshot,
            has_meta,
            received_at,
            events,
        }
    }

    /// Structural validity: a playable recording needs at least one full
    /// snapshot and one metadata frame
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.has_full_snapshot && self.has_meta
    }

    /// Minimal valid replay for store-level tests
    #[cfg(test)]
    pub fn test_fixture(id: &str, app_id: AppId) -> Self {
        Self::from_frames(
            id.to_string(),
            app_id,
            None,
            serde_json::json!([
                {"type": META_TYPE, "timestamp": 1_000},
                {"type": FULL_SNAPSHOT_TYPE, "timestamp": 1_016},
            ]),
            None,
            None,
            2_000,
        )
    }
}
