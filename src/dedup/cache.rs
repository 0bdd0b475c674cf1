/*!
 * In-Process Dedup Cache
 * DashMap-backed sliding-window counters
 */

use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::traits::{DedupDecision, DedupStats, DedupStore};
use crate::core::limits::{DEFAULT_DEDUP_WINDOW, MAX_DEDUP_ENTRIES};
use crate::core::types::{AppId, EventId, Fingerprint, TimestampMs};

/// One live window
#[derive(Debug, Clone)]
struct WindowEntry {
    /// Receive time of the occurrence that opened the window
    window_start: TimestampMs,
    count: u64,
    /// Row the window's occurrences fold into
    head_event: EventId,
}

/// In-process dedup cache
///
/// Each `(app_id, fingerprint)` key holds one window entry; the DashMap
/// entry lock serializes concurrent occurrences for the same key, so counts
/// never lose updates. An expired entry is replaced in place rather than
/// swept, keeping the hot path allocation-free.
#[derive(Clone)]
pub struct DedupCache {
    entries: Arc<DashMap<(AppId, Fingerprint), WindowEntry, RandomState>>,
    window_ms: u64,
    max_entries: usize,
    windows_opened: Arc<AtomicU64>,
    duplicates: Arc<AtomicU64>,
}

impl DedupCache {
    /// Create new cache with the given window length
    pub fn new(window: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::with_hasher(RandomState::new())),
            window_ms: window.as_millis() as u64,
            max_entries: MAX_DEDUP_ENTRIES,
            windows_opened: Arc::new(AtomicU64::new(0)),
            duplicates: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Override the entry cap (tests)
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Drop expired entries; returns how many were removed
    ///
    /// The hot path never needs this (expired entries are replaced on
    /// access); it exists so an idle fingerprint set does not pin memory
    /// forever. Called opportunistically when the cap is reached.
    pub fn sweep_expired(&self, now: TimestampMs) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.window_start) <= self.window_ms);
        before - self.entries.len()
    }

    /// Evict one arbitrary entry when at capacity
    fn make_room(&self, now: TimestampMs) {
        if self.entries.len() < self.max_entries {
            return;
        }
        if self.sweep_expired(now) > 0 {
            return;
        }
        if let Some(entry) = self.entries.iter().next() {
            let evict = entry.key().clone();
            drop(entry);
            self.entries.remove(&evict);
            tracing::debug!(app_id = evict.0, "dedup cache full, evicted live window");
        }
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

impl DedupStore for DedupCache {
    fn record_occurrence(
        &self,
        app_id: AppId,
        fingerprint: &Fingerprint,
        now: TimestampMs,
        candidate: EventId,
    ) -> DedupDecision {
        let key = (app_id, fingerprint.clone());
        if !self.entries.contains_key(&key) {
            self.make_room(now);
        }

        let mut entry = self.entries.entry(key).or_insert_with(|| WindowEntry {
            window_start: now,
            count: 0,
            head_event: candidate,
        });

        let age = now.saturating_sub(entry.window_start);
        if entry.count > 0 && age > self.window_ms {
            // Window elapsed: replace in place
            entry.window_start = now;
            entry.count = 0;
            entry.head_event = candidate;
        }

        entry.count += 1;
        let decision = DedupDecision {
            is_new_window: entry.count == 1,
            count: entry.count,
            event_id: entry.head_event,
        };
        drop(entry);

        if decision.is_new_window {
            self.windows_opened.fetch_add(1, Ordering::Relaxed);
        } else {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
        }
        decision
    }

    fn stats(&self) -> DedupStats {
        DedupStats {
            entries: self.entries.len(),
            windows_opened: self.windows_opened.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
