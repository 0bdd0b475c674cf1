/*!
 * Core Types
 * Common identifiers and aliases used across the pipeline
 */

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Application identifier (assigned when an app is registered)
pub type AppId = u32;

/// Event identifier
pub type EventId = Uuid;

/// Session identifier assigned by the browser SDK
pub type SessionId = String;

/// Replay identifier assigned by the browser SDK
pub type ReplayId = String;

/// Release/version string an event was built from
pub type Release = String;

/// Stable error-class fingerprint (lowercase hex)
pub type Fingerprint = String;

/// Wall-clock timestamp in milliseconds since UNIX epoch
///
/// Matches what browser SDKs emit (`Date.now()`), so client and server
/// timestamps are directly comparable.
pub type TimestampMs = u64;

/// Current wall-clock time in milliseconds since UNIX epoch
#[inline]
pub fn now_ms() -> TimestampMs {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as TimestampMs)
        .unwrap_or(0)
}

/// Build/runtime information reported by the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub version: String,
    pub started_at_ms: TimestampMs,
    pub uptime_secs: u64,
}
