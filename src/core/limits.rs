/*!
 * Pipeline Limits
 *
 * Every tunable and cap in one place, grouped by pipeline stage.
 * [PERF] marks values chosen for throughput, [SAFETY] marks values
 * that bound damage from misbehaving or hostile clients.
 */

use std::time::Duration;

// =============================================================================
// INGEST LIMITS
// =============================================================================

/// Maximum size of a single event payload (1MB)
/// [SAFETY] A browser error with breadcrumbs and context stays well under this
pub const MAX_EVENT_BYTES: usize = 1024 * 1024;

/// Maximum events accepted in one batch envelope (500 events)
/// [SAFETY] SDKs flush small batches; anything larger is a misbehaving client
pub const MAX_BATCH_EVENTS: usize = 500;

/// Maximum raw stack trace length retained per event (64KB)
/// Longer traces are truncated before parsing
pub const MAX_STACK_BYTES: usize = 64 * 1024;

/// Maximum stack frames parsed from one trace (128 frames)
/// [SAFETY] Recursive crashes produce thousands of identical frames;
/// resolution cost is linear in frame count
pub const MAX_STACK_FRAMES: usize = 128;

/// Maximum length of an error message before normalization truncates it
pub const MAX_MESSAGE_LEN: usize = 4096;

// =============================================================================
// FINGERPRINTING
// =============================================================================

/// Stack frames contributing to the fingerprint (top 5)
/// Deep frames churn across minified builds; the top of the stack is
/// what identifies the error class
pub const FINGERPRINT_FRAME_COUNT: usize = 5;

// =============================================================================
// DEDUPLICATION
// =============================================================================

/// Sliding dedup window (5 seconds)
/// Repeats of the same (app, fingerprint) inside this window collapse
/// into one stored row with an incremented counter
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(5);

/// Maximum live dedup windows tracked at once (100,000 entries)
/// [SAFETY] Bounds memory under fingerprint-cardinality attacks
pub const MAX_DEDUP_ENTRIES: usize = 100_000;

// =============================================================================
// SOURCE MAP RESOLUTION
// =============================================================================

/// Resolution worker count (4 workers)
/// Resolution is CPU-light after the map is parsed; a handful of workers
/// keeps up with ingest without starving the runtime
pub const DEFAULT_RESOLVE_WORKERS: usize = 4;

/// Maximum attempts per resolution task (3 attempts)
/// Covers transient store hiccups; a map that is genuinely absent
/// fails the same way every time
pub const RESOLVE_MAX_ATTEMPTS: u32 = 3;

/// Delay before a failed resolution task is retried (500ms)
pub const RESOLVE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Resolution queue capacity (10,000 tasks)
/// [SAFETY] Backpressure: ingest drops resolution (not the event) when full
pub const RESOLVE_QUEUE_CAPACITY: usize = 10_000;

/// Parsed source map cache capacity (64 maps)
/// [PERF] Parsing a multi-MB map dominates resolution cost; a burst of
/// errors from one release hits the same few maps
pub const PARSED_MAP_CACHE_CAPACITY: usize = 64;

/// Maximum accepted source map upload size (32MB)
/// [SAFETY] Bundled vendor maps run large but not unbounded
pub const MAX_SOURCEMAP_BYTES: usize = 32 * 1024 * 1024;

// =============================================================================
// REPLAY CORRELATION
// =============================================================================

/// Delay before the single correlation retry (2 seconds)
/// Replay uploads race error ingestion; one short wait covers the
/// common case of the replay arriving moments later
pub const REPLAY_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Maximum replay payload size (16MB)
/// [SAFETY] rrweb full snapshots of heavy DOMs are large but bounded
pub const MAX_REPLAY_BYTES: usize = 16 * 1024 * 1024;

// =============================================================================
// SPIKE DETECTION
// =============================================================================

/// Baseline multiplier that qualifies as a spike (2x)
/// Current-window rate must exceed baseline rate by this factor
pub const DEFAULT_SPIKE_MULTIPLIER: f64 = 2.0;

/// Minimum current-window count for a spike (10 events)
/// [SAFETY] Absolute floor so 1 -> 3 errors never pages anyone
pub const DEFAULT_SPIKE_MIN_COUNT: u64 = 10;

/// Severity band thresholds (ratio of current rate to baseline rate)
/// >=10x critical, >=5x high, >=2x medium, below that low
pub const SPIKE_CRITICAL_RATIO: f64 = 10.0;
pub const SPIKE_HIGH_RATIO: f64 = 5.0;
pub const SPIKE_MEDIUM_RATIO: f64 = 2.0;

/// Comparison window length (60 seconds)
/// Current window is measured against the preceding window of equal length
pub const DEFAULT_SPIKE_WINDOW: Duration = Duration::from_secs(60);

/// How often the detector re-evaluates windows (60 seconds)
pub const DEFAULT_SPIKE_INTERVAL: Duration = Duration::from_secs(60);

// =============================================================================
// LIVE STREAMING
// =============================================================================

/// Per-subscriber channel capacity (256 messages)
/// Slow consumers drop messages rather than stall the pipeline
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// Heartbeat interval for idle streams (15 seconds)
/// Keeps intermediary proxies from reaping quiet connections
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

// =============================================================================
// PERFORMANCE TUNING
// =============================================================================

/// JSON SIMD threshold (1KB)
/// [PERF] Use simd_json for payloads >1KB, std::json for smaller
pub const JSON_SIMD_THRESHOLD: usize = 1024;
