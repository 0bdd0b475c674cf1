/*!
 * In-Memory Event Store
 * Fast, volatile storage backend for development and tests
 */

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::store::{EventStore, StoreError, StoreResult, StoreStats};
use super::types::{EventFilter, EventKind, ResolutionStatus, StoredEvent};
use crate::core::types::{AppId, EventId, Fingerprint, ReplayId, TimestampMs};
use crate::replay::types::StoredReplay;

/// Default limit for unbounded list queries
const DEFAULT_QUERY_LIMIT: usize = 100;

/// In-memory event store implementation
///
/// Rows live in a DashMap keyed by event id, with a per-app insertion-order
/// index for window scans. An optional per-app cap evicts the oldest rows
/// so long-running dev instances stay bounded.
#[derive(Clone)]
pub struct MemoryEventStore {
    events: Arc<DashMap<EventId, StoredEvent, RandomState>>,
    /// Insertion-ordered event ids per app (oldest first)
    by_app: Arc<DashMap<AppId, Mutex<VecDeque<EventId>>, RandomState>>,
    by_replay: Arc<DashMap<ReplayId, Vec<EventId>, RandomState>>,
    replays: Arc<DashMap<ReplayId, StoredReplay, RandomState>>,
    max_events_per_app: Option<usize>,
    event_count: Arc<AtomicU64>,
    replay_count: Arc<AtomicU64>,
    dedup_folds: Arc<AtomicU64>,
}

impl MemoryEventStore {
    /// Create new unbounded in-memory store
    pub fn new() -> Self {
        Self {
            events: Arc::new(DashMap::with_hasher(RandomState::new())),
            by_app: Arc::new(DashMap::with_hasher(RandomState::new())),
            by_replay: Arc::new(DashMap::with_hasher(RandomState::new())),
            replays: Arc::new(DashMap::with_hasher(RandomState::new())),
            max_events_per_app: None,
            event_count: Arc::new(AtomicU64::new(0)),
            replay_count: Arc::new(AtomicU64::new(0)),
            dedup_folds: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create with a per-app row cap (oldest rows evicted)
    pub fn with_capacity(max_events_per_app: usize) -> Self {
        let mut store = Self::new();
        store.max_events_per_app = Some(max_events_per_app);
        store
    }

    fn evict_oldest(&self, app_id: AppId, order: &mut VecDeque<EventId>) {
        if let Some(evicted) = order.pop_front() {
            if let Some((_, event)) = self.events.remove(&evicted) {
                if let Some(replay_id) = &event.replay_id {
                    if let Some(mut ids) = self.by_replay.get_mut(replay_id) {
                        ids.retain(|id| *id != evicted);
                    }
                }
                self.event_count.fetch_sub(1, Ordering::Relaxed);
                tracing::debug!(app_id, event_id = %evicted, "evicted oldest event row");
            }
        }
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryEventStore {
    fn insert_event(&self, event: StoredEvent) -> StoreResult<()> {
        let id = event.id;
        let app_id = event.app_id;

        if let Some(replay_id) = &event.replay_id {
            self.by_replay
                .entry(replay_id.clone())
                .or_default()
                .push(id);
        }

        self.events.insert(id, event);
        self.event_count.fetch_add(1, Ordering::Relaxed);

        let order = self.by_app.entry(app_id).or_default();
        let mut order = order.lock();
        order.push_back(id);
        if let Some(cap) = self.max_events_per_app {
            while order.len() > cap {
                self.evict_oldest(app_id, &mut order);
            }
        }

        Ok(())
    }

    fn get_event(&self, id: EventId) -> StoreResult<StoredEvent> {
        self.events
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::EventNotFound(id))
    }

    fn update_dedup_count(&self, id: EventId, count: u64) -> StoreResult<u64> {
        let mut entry = self
            .events
            .get_mut(&id)
            .ok_or(StoreError::EventNotFound(id))?;
        if count > entry.dedup_count {
            entry.dedup_count = count;
            self.dedup_folds.fetch_add(1, Ordering::Relaxed);
        }
        Ok(entry.dedup_count)
    }

    fn update_resolution(
        &self,
        id: EventId,
        status: ResolutionStatus,
        resolved_stack: Option<String>,
    ) -> StoreResult<()> {
        let mut entry = self
            .events
            .get_mut(&id)
            .ok_or(StoreError::EventNotFound(id))?;
        // Resolution fields mutate once; a duplicate worker run is a no-op
        if matches!(
            entry.resolution,
            ResolutionStatus::Resolved | ResolutionStatus::Failed
        ) {
            return Ok(());
        }
        entry.resolution = status;
        if resolved_stack.is_some() {
            entry.resolved_stack = resolved_stack;
        }
        Ok(())
    }

    fn recent_events(&self, app_id: AppId, filter: &EventFilter) -> Vec<StoredEvent> {
        let limit = filter.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let Some(order) = self.by_app.get(&app_id) else {
            return Vec::new();
        };
        let order = order.lock();

        let mut out = Vec::new();
        // Newest first: walk insertion order backwards
        for id in order.iter().rev() {
            if out.len() >= limit {
                break;
            }
            if let Some(event) = self.events.get(id) {
                if event.matches(filter) {
                    out.push(event.value().clone());
                }
            }
        }
        out
    }

    fn count_occurrences(
        &self,
        app_id: AppId,
        fingerprint: &Fingerprint,
        since_ms: TimestampMs,
        until_ms: TimestampMs,
    ) -> u64 {
        let Some(order) = self.by_app.get(&app_id) else {
            return 0;
        };
        let order = order.lock();

        let mut total = 0u64;
        for id in order.iter().rev() {
            let Some(event) = self.events.get(id) else {
                continue;
            };
            // Index is time-ordered; everything older than the window is done
            if event.received_at < since_ms {
                break;
            }
            if event.received_at >= until_ms {
                continue;
            }
            if event.fingerprint.as_ref() == Some(fingerprint) {
                total += event.dedup_count;
            }
        }
        total
    }

    fn fingerprints_active(
        &self,
        app_id: AppId,
        since_ms: TimestampMs,
        until_ms: TimestampMs,
    ) -> Vec<Fingerprint> {
        let Some(order) = self.by_app.get(&app_id) else {
            return Vec::new();
        };
        let order = order.lock();

        let mut seen = Vec::new();
        for id in order.iter().rev() {
            let Some(event) = self.events.get(id) else {
                continue;
            };
            if event.received_at < since_ms {
                break;
            }
            if event.received_at >= until_ms {
                continue;
            }
            if let Some(fingerprint) = &event.fingerprint {
                if !seen.contains(fingerprint) {
                    seen.push(fingerprint.clone());
                }
            }
        }
        seen
    }

    fn apps_active(&self, since_ms: TimestampMs) -> Vec<AppId> {
        let mut apps = Vec::new();
        for entry in self.by_app.iter() {
            let app_id = *entry.key();
            let order = entry.value().lock();
            let active = order.iter().rev().any(|id| {
                self.events
                    .get(id)
                    .map(|e| e.kind() == EventKind::Error && e.received_at >= since_ms)
                    .unwrap_or(false)
            });
            if active {
                apps.push(app_id);
            }
        }
        apps.sort_unstable();
        apps
    }

    fn events_by_replay(&self, replay_id: &ReplayId, limit: usize) -> Vec<StoredEvent> {
        let Some(ids) = self.by_replay.get(replay_id) else {
            return Vec::new();
        };
        let mut related: Vec<StoredEvent> = ids
            .iter()
            .filter_map(|id| self.events.get(id).map(|e| e.value().clone()))
            .filter(StoredEvent::is_error)
            .collect();
        related.sort_by_key(|e| e.received_at);
        related.truncate(limit);
        related
    }

    fn put_replay(&self, replay: StoredReplay) -> StoreResult<()> {
        if self.replays.insert(replay.id.clone(), replay).is_none() {
            self.replay_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn get_replay(&self, replay_id: &ReplayId) -> Option<StoredReplay> {
        self.replays.get(replay_id).map(|entry| entry.value().clone())
    }

    fn stats(&self) -> StoreStats {
        StoreStats {
            events: self.event_count.load(Ordering::Relaxed),
            replays: self.replay_count.load(Ordering::Relaxed),
            dedup_folds: self.dedup_folds.load(Ordering::Relaxed),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
