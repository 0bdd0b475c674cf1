/*!
 * Pipeline Configuration
 * Environment-driven settings with compiled-in defaults
 */

use crate::core::limits;
use std::time::Duration;

/// Runtime configuration for the ingestion pipeline
///
/// Every field has a compiled-in default from `core::limits` and an
/// `ARGUS_*` environment override. Unparsable or empty values fall back
/// to the default rather than failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address
    pub addr: String,
    /// Sliding window for burst deduplication
    pub dedup_window: Duration,
    /// Resolution worker count
    pub resolve_workers: usize,
    /// Maximum attempts per resolution task
    pub resolve_max_attempts: u32,
    /// Delay before a failed resolution task re-enters the queue
    pub resolve_retry_delay: Duration,
    /// Delay before the single replay correlation retry
    pub replay_retry_delay: Duration,
    /// Baseline multiplier that qualifies as a spike
    pub spike_multiplier: f64,
    /// Absolute floor on current-window count for a spike
    pub spike_min_count: u64,
    /// Length of the spike comparison window
    pub spike_window: Duration,
    /// How often the spike detector re-evaluates
    pub spike_interval: Duration,
    /// Heartbeat interval for idle live streams
    pub heartbeat_interval: Duration,
    /// Per-subscriber channel capacity
    pub subscriber_capacity: usize,
    /// Parsed source map cache capacity
    pub map_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:4000".to_string(),
            dedup_window: limits::DEFAULT_DEDUP_WINDOW,
            resolve_workers: limits::DEFAULT_RESOLVE_WORKERS,
            resolve_max_attempts: limits::RESOLVE_MAX_ATTEMPTS,
            resolve_retry_delay: limits::RESOLVE_RETRY_DELAY,
            replay_retry_delay: limits::REPLAY_RETRY_DELAY,
            spike_multiplier: limits::DEFAULT_SPIKE_MULTIPLIER,
            spike_min_count: limits::DEFAULT_SPIKE_MIN_COUNT,
            spike_window: limits::DEFAULT_SPIKE_WINDOW,
            spike_interval: limits::DEFAULT_SPIKE_INTERVAL,
            heartbeat_interval: limits::DEFAULT_HEARTBEAT_INTERVAL,
            subscriber_capacity: limits::SUBSCRIBER_CHANNEL_CAPACITY,
            map_cache_capacity: limits::PARSED_MAP_CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            addr: env_string("ARGUS_ADDR", &defaults.addr),
            dedup_window: env_duration_ms("ARGUS_DEDUP_WINDOW_MS", defaults.dedup_window),
            resolve_workers: env_usize("ARGUS_RESOLVE_WORKERS", defaults.resolve_workers),
            resolve_max_attempts: env_u32(
                "ARGUS_RESOLVE_MAX_ATTEMPTS",
                defaults.resolve_max_attempts,
            ),
            resolve_retry_delay: env_duration_ms(
                "ARGUS_RESOLVE_RETRY_MS",
                defaults.resolve_retry_delay,
            ),
            replay_retry_delay: env_duration_ms(
                "ARGUS_REPLAY_RETRY_MS",
                defaults.replay_retry_delay,
            ),
            spike_multiplier: env_f64("ARGUS_SPIKE_MULTIPLIER", defaults.spike_multiplier),
            spike_min_count: env_u64("ARGUS_SPIKE_MIN_COUNT", defaults.spike_min_count),
            spike_window: env_duration_secs("ARGUS_SPIKE_WINDOW_SECS", defaults.spike_window),
            spike_interval: env_duration_secs("ARGUS_SPIKE_INTERVAL_SECS", defaults.spike_interval),
            heartbeat_interval: env_duration_secs(
                "ARGUS_HEARTBEAT_SECS",
                defaults.heartbeat_interval,
            ),
            subscriber_capacity: env_usize(
                "ARGUS_SUBSCRIBER_CAPACITY",
                defaults.subscriber_capacity,
            ),
            map_cache_capacity: env_usize("ARGUS_MAP_CACHE_CAPACITY", defaults.map_cache_capacity),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
