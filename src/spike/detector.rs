/*!
 * Spike Detector
 * Flags error classes erupting above their own recent baseline
 *
 * Evaluation is read-only over the event store: the current window is
 * compared against the preceding window of equal length, per
 * (application, fingerprint). Because the windows are equal length, the
 * occurrence-count ratio equals the rate ratio.
 */

use crate::core::limits::{
    DEFAULT_SPIKE_MIN_COUNT, DEFAULT_SPIKE_MULTIPLIER, DEFAULT_SPIKE_WINDOW, SPIKE_CRITICAL_RATIO,
    SPIKE_HIGH_RATIO, SPIKE_MEDIUM_RATIO,
};
use crate::core::types::{now_ms, AppId, Fingerprint, TimestampMs};
use crate::event::store::EventStore;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// ALERT MODEL
// =============================================================================

/// How far above baseline the eruption sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpikeSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SpikeSeverity {
    /// Band for a current/baseline rate ratio
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= SPIKE_CRITICAL_RATIO {
            SpikeSeverity::Critical
        } else if ratio >= SPIKE_HIGH_RATIO {
            SpikeSeverity::High
        } else if ratio >= SPIKE_MEDIUM_RATIO {
            SpikeSeverity::Medium
        } else {
            SpikeSeverity::Low
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            SpikeSeverity::Low => "low",
            SpikeSeverity::Medium => "medium",
            SpikeSeverity::High => "high",
            SpikeSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for SpikeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flagged (application, fingerprint) eruption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeAlert {
    pub app_id: AppId,
    pub fingerprint: Fingerprint,
    /// Occurrences (dedup counts included) in the current window
    pub current_count: u64,
    /// Occurrences in the preceding window of equal length
    pub baseline_count: u64,
    /// Current rate over baseline rate; a zero baseline counts as one
    pub ratio: f64,
    pub severity: SpikeSeverity,
    pub window_ms: u64,
    pub detected_at: TimestampMs,
}

/// All alerts live as of one evaluation
#[derive(Debug, Clone, Default)]
pub struct SpikeSnapshot {
    pub evaluated_at: TimestampMs,
    pub alerts: Vec<SpikeAlert>,
}

/// Detector statistics for the health endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpikeStats {
    pub evaluations: u64,
    /// Alerts raised for the first time (re-confirmations not counted)
    pub alerts_raised: u64,
    pub alerts_active: usize,
}

// =============================================================================
// DETECTOR
// =============================================================================

/// Baseline-relative spike detection over the event store
pub struct SpikeDetector {
    store: Arc<dyn EventStore>,
    multiplier: f64,
    min_count: u64,
    window: Duration,
    snapshot: ArcSwap<SpikeSnapshot>,
    evaluations: AtomicU64,
    alerts_raised: AtomicU64,
}

impl SpikeDetector {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            multiplier: DEFAULT_SPIKE_MULTIPLIER,
            min_count: DEFAULT_SPIKE_MIN_COUNT,
            window: DEFAULT_SPIKE_WINDOW,
            snapshot: ArcSwap::from_pointee(SpikeSnapshot::default()),
            evaluations: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
        }
    }

    /// Override the rate multiplier and absolute count floor
    pub fn with_thresholds(mut self, multiplier: f64, min_count: u64) -> Self {
        self.multiplier = multiplier;
        self.min_count = min_count;
        self
    }

    /// Override the comparison window length
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Evaluate all active apps at a fixed point in time
    ///
    /// Pure read; does not touch the published snapshot.
    pub fn evaluate_at(&self, now: TimestampMs) -> Vec<SpikeAlert> {
        let window_ms = self.window.as_millis() as u64;
        let current_start = now.saturating_sub(window_ms);
        let baseline_start = now.saturating_sub(2 * window_ms);

        let mut alerts = Vec::new();
        for app_id in self.store.apps_active(current_start) {
            for fingerprint in self.store.fingerprints_active(app_id, current_start, now) {
                let current = self
                    .store
                    .count_occurrences(app_id, &fingerprint, current_start, now);
                if current < self.min_count {
                    continue;
                }

                let baseline =
                    self.store
                        .count_occurrences(app_id, &fingerprint, baseline_start, current_start);
                let ratio = current as f64 / baseline.max(1) as f64;
                if ratio > self.multiplier {
                    alerts.push(SpikeAlert {
                        app_id,
                        fingerprint,
                        current_count: current,
                        baseline_count: baseline,
                        ratio,
                        severity: SpikeSeverity::from_ratio(ratio),
                        window_ms,
                        detected_at: now,
                    });
                }
            }
        }
        alerts
    }

    /// Re-evaluate now, replace the snapshot, and return alerts that were
    /// not flagged in the previous snapshot
    pub fn refresh(&self) -> Vec<SpikeAlert> {
        let now = now_ms();
        let alerts = self.evaluate_at(now);
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let previous = self.snapshot.swap(Arc::new(SpikeSnapshot {
            evaluated_at: now,
            alerts: alerts.clone(),
        }));

        let known: HashSet<(AppId, &Fingerprint)> = previous
            .alerts
            .iter()
            .map(|alert| (alert.app_id, &alert.fingerprint))
            .collect();
        let newly: Vec<SpikeAlert> = alerts
            .into_iter()
            .filter(|alert| !known.contains(&(alert.app_id, &alert.fingerprint)))
            .collect();

        self.alerts_raised
            .fetch_add(newly.len() as u64, Ordering::Relaxed);
        newly
    }

    /// Most recent evaluation result
    pub fn current(&self) -> Arc<SpikeSnapshot> {
        self.snapshot.load_full()
    }

    /// Get detector statistics
    pub fn stats(&self) -> SpikeStats {
        SpikeStats {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            alerts_active: self.snapshot.load().alerts.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::memory::MemoryEventStore;
    use crate::event::types::{EventPayload, ResolutionStatus, StoredEvent};
    use uuid::Uuid;

    const WINDOW: Duration = Duration::from_secs(60);
    const NOW: TimestampMs = 200_000;

    fn occurrence(
        store: &MemoryEventStore,
        app_id: AppId,
        fingerprint: &str,
        received_at: TimestampMs,
        dedup_count: u64,
    ) {
        let event = StoredEvent {
            id: Uuid::new_v4(),
            app_id,
            payload: EventPayload::Error {
                error_type: "TypeError".into(),
                message: "boom".to_string(),
                stack: None,
            },
            fingerprint: Some(fingerprint.to_string()),
            dedup_count,
            resolution: ResolutionStatus::Skipped,
            resolved_stack: None,
            session_id: None,
            replay_id: None,
            release: None,
            url: None,
            user_agent: None,
            client_timestamp: None,
            received_at,
        };
        store.insert_event(event).unwrap();
    }

    fn detector(store: Arc<MemoryEventStore>) -> SpikeDetector {
        SpikeDetector::new(store).with_window(WINDOW)
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(SpikeSeverity::from_ratio(12.0), SpikeSeverity::Critical);
        assert_eq!(SpikeSeverity::from_ratio(10.0), SpikeSeverity::Critical);
        assert_eq!(SpikeSeverity::from_ratio(9.9), SpikeSeverity::High);
        assert_eq!(SpikeSeverity::from_ratio(5.0), SpikeSeverity::High);
        assert_eq!(SpikeSeverity::from_ratio(4.0), SpikeSeverity::Medium);
        assert_eq!(SpikeSeverity::from_ratio(2.0), SpikeSeverity::Medium);
        assert_eq!(SpikeSeverity::from_ratio(1.5), SpikeSeverity::Low);
    }

    #[test]
    fn test_steady_rate_is_not_a_spike() {
        let store = Arc::new(MemoryEventStore::new());
        // Baseline window [80s, 140s): 10; current window [140s, 200s): 15
        occurrence(&store, 1, "fp-a", 100_000, 10);
        occurrence(&store, 1, "fp-a", 150_000, 15);

        let alerts = detector(store).evaluate_at(NOW);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_modest_increase_crosses_multiplier() {
        let store = Arc::new(MemoryEventStore::new());
        // Baseline 10, current 25: ratio 2.5 clears the 2x multiplier
        occurrence(&store, 1, "fp-a", 100_000, 10);
        occurrence(&store, 1, "fp-a", 150_000, 25);

        let alerts = detector(store).evaluate_at(NOW);
        assert_eq!(alerts.len(), 1);
        assert!((alerts[0].ratio - 2.5).abs() < f64::EPSILON);
        assert_eq!(alerts[0].severity, SpikeSeverity::Medium);
    }

    #[test]
    fn test_eruption_is_flagged_with_band() {
        let store = Arc::new(MemoryEventStore::new());
        occurrence(&store, 1, "fp-a", 100_000, 4);
        occurrence(&store, 1, "fp-a", 150_000, 22);

        let alerts = detector(store).evaluate_at(NOW);
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.app_id, 1);
        assert_eq!(alert.fingerprint, "fp-a");
        assert_eq!(alert.current_count, 22);
        assert_eq!(alert.baseline_count, 4);
        assert!((alert.ratio - 5.5).abs() < f64::EPSILON);
        assert_eq!(alert.severity, SpikeSeverity::High);
        assert_eq!(alert.window_ms, 60_000);
    }

    #[test]
    fn test_floor_suppresses_small_eruptions() {
        let store = Arc::new(MemoryEventStore::new());
        // 1 -> 8 is an 8x jump but below the absolute floor of 10
        occurrence(&store, 1, "fp-a", 100_000, 1);
        occurrence(&store, 1, "fp-a", 150_000, 8);

        let alerts = detector(store).evaluate_at(NOW);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_zero_baseline_counts_as_one() {
        let store = Arc::new(MemoryEventStore::new());
        occurrence(&store, 1, "fp-new", 150_000, 12);

        let alerts = detector(store).evaluate_at(NOW);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].baseline_count, 0);
        assert!((alerts[0].ratio - 12.0).abs() < f64::EPSILON);
        assert_eq!(alerts[0].severity, SpikeSeverity::Critical);
    }

    #[test]
    fn test_apps_evaluated_independently() {
        let store = Arc::new(MemoryEventStore::new());
        // App 1 erupts, app 2 is steady on the same fingerprint
        occurrence(&store, 1, "fp-a", 150_000, 30);
        occurrence(&store, 2, "fp-a", 100_000, 20);
        occurrence(&store, 2, "fp-a", 150_000, 25);

        let alerts = detector(store).evaluate_at(NOW);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].app_id, 1);
    }

    #[test]
    fn test_refresh_reports_each_alert_once() {
        let store = Arc::new(MemoryEventStore::new());
        // Recent eruption relative to the real clock
        let now = now_ms();
        occurrence(&store, 1, "fp-a", now.saturating_sub(1_000), 40);

        let detector = detector(store);
        let first = detector.refresh();
        assert_eq!(first.len(), 1);

        // Still erupting, but already known
        let second = detector.refresh();
        assert!(second.is_empty());

        let stats = detector.stats();
        assert_eq!(stats.evaluations, 2);
        assert_eq!(stats.alerts_raised, 1);
        assert_eq!(stats.alerts_active, 1);
        assert_eq!(detector.current().alerts.len(), 1);
    }
}
