/*!
 * Replay Correlator
 * Bounded-retry lookup joining error events to their recordings
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::types::StoredReplay;
use crate::core::limits::REPLAY_RETRY_DELAY;
use crate::core::types::{AppId, ReplayId};
use crate::event::store::EventStore;
use crate::event::types::StoredEvent;
use serde::{Deserialize, Serialize};

/// Upper bound on the related-errors join
const RELATED_ERRORS_LIMIT: usize = 500;

/// Point-in-time correlator statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelatorStats {
    pub lookups: u64,
    /// Lookups that only succeeded on the post-delay retry
    pub late_hits: u64,
    pub misses: u64,
}

/// Correlator joining replays with their error events
///
/// Error events and the replay upload they reference arrive on independent
/// paths, and the upload can lag by seconds. A first-lookup miss therefore
/// waits one fixed delay and retries exactly once before reporting absence.
pub struct ReplayCorrelator {
    store: Arc<dyn EventStore>,
    retry_delay: Duration,
    lookups: AtomicU64,
    late_hits: AtomicU64,
    misses: AtomicU64,
}

impl ReplayCorrelator {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self::with_retry_delay(store, REPLAY_RETRY_DELAY)
    }

    pub fn with_retry_delay(store: Arc<dyn EventStore>, retry_delay: Duration) -> Self {
        Self {
            store,
            retry_delay,
            lookups: AtomicU64::new(0),
            late_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Fetch a replay, retrying once after a delay on a first miss
    ///
    /// The wait is a per-request suspension; no lock is held across it.
    pub async fn get_replay(
        &self,
        replay_id: &ReplayId,
        app_id: AppId,
        retry_once: bool,
    ) -> Option<StoredReplay> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        let fetch = || {
            self.store
                .get_replay(replay_id)
                .filter(|replay| replay.app_id == app_id)
        };

        let mut late = false;
        let replay = match fetch() {
            Some(replay) => Some(replay),
            None if retry_once => {
                tokio::time::sleep(self.retry_delay).await;
                late = true;
                fetch()
            }
            None => None,
        };

        match &replay {
            Some(replay) => {
                if late {
                    self.late_hits.fetch_add(1, Ordering::Relaxed);
                }
                if !replay.is_valid() {
                    tracing::warn!(
                        replay_id = %replay.id,
                        app_id,
                        has_full_snapshot = replay.has_full_snapshot,
                        has_meta = replay.has_meta,
                        "replay missing structural frames, playback may be degraded"
                    );
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
        replay
    }

    /// All error events sharing this replay id, timestamp ascending
    ///
    /// Works regardless of whether the replay record itself exists or is
    /// structurally valid.
    pub fn related_errors(&self, replay_id: &ReplayId, app_id: AppId) -> Vec<StoredEvent> {
        self.store
            .events_by_replay(replay_id, RELATED_ERRORS_LIMIT)
            .into_iter()
            .filter(|event| event.app_id == app_id)
            .collect()
    }

    /// Point-in-time statistics
    pub fn stats(&self) -> CorrelatorStats {
        CorrelatorStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            late_hits: self.late_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::memory::MemoryEventStore;
    use crate::event::types::{Envelope, EventPayload, StoredEvent};
    use std::time::Instant;
    use uuid::Uuid;

    fn correlator(store: &Arc<MemoryEventStore>, delay_ms: u64) -> ReplayCorrelator {
        ReplayCorrelator::with_retry_delay(
            Arc::clone(store) as Arc<dyn EventStore>,
            Duration::from_millis(delay_ms),
        )
    }

    fn error_with_replay(app_id: AppId, replay_id: &str, received_at: u64) -> StoredEvent {
        let envelope = Envelope {
            payload: EventPayload::Error {
                error_type: "TypeError".into(),
                message: "boom".to_string(),
                stack: None,
            },
            session_id: None,
            replay_id: Some(replay_id.to_string()),
            release: None,
            url: None,
            user_agent: None,
            timestamp: None,
        };
        StoredEvent::from_envelope(Uuid::new_v4(), app_id, envelope, received_at)
    }

    #[tokio::test]
    async fn test_present_replay_returns_immediately() {
        let store = Arc::new(MemoryEventStore::new());
        store
            .put_replay(StoredReplay::test_fixture("rep-1", 1))
            .unwrap();
        let correlator = correlator(&store, 200);

        let start = Instant::now();
        let replay = correlator.get_replay(&"rep-1".to_string(), 1, true).await;
        assert!(replay.is_some());
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(correlator.stats().late_hits, 0);
    }

    #[tokio::test]
    async fn test_miss_waits_through_single_retry() {
        let store = Arc::new(MemoryEventStore::new());
        let correlator = correlator(&store, 80);

        let start = Instant::now();
        let replay = correlator.get_replay(&"rep-x".to_string(), 1, true).await;
        assert!(replay.is_none());
        assert!(start.elapsed() >= Duration::from_millis(80));
        assert_eq!(correlator.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_no_retry_fails_fast() {
        let store = Arc::new(MemoryEventStore::new());
        let correlator = correlator(&store, 500);

        let start = Instant::now();
        let replay = correlator.get_replay(&"rep-x".to_string(), 1, false).await;
        assert!(replay.is_none());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_replay_appearing_during_wait_is_found() {
        let store = Arc::new(MemoryEventStore::new());
        let correlator = correlator(&store, 120);

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                store
                    .put_replay(StoredReplay::test_fixture("rep-late", 1))
                    .unwrap();
            })
        };

        let replay = correlator.get_replay(&"rep-late".to_string(), 1, true).await;
        assert!(replay.is_some());
        assert_eq!(correlator.stats().late_hits, 1);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_app_mismatch_is_a_miss() {
        let store = Arc::new(MemoryEventStore::new());
        store
            .put_replay(StoredReplay::test_fixture("rep-1", 1))
            .unwrap();
        let correlator = correlator(&store, 20);

        let replay = correlator.get_replay(&"rep-1".to_string(), 2, false).await;
        assert!(replay.is_none());
    }

    #[tokio::test]
    async fn test_related_errors_scoped_to_app() {
        let store = Arc::new(MemoryEventStore::new());
        store.insert_event(error_with_replay(1, "rep-1", 300)).unwrap();
        store.insert_event(error_with_replay(1, "rep-1", 100)).unwrap();
        store.insert_event(error_with_replay(2, "rep-1", 200)).unwrap();
        let correlator = correlator(&store, 20);

        let related = correlator.related_errors(&"rep-1".to_string(), 1);
        assert_eq!(related.len(), 2);
        assert_eq!(related[0].received_at, 100);
        assert_eq!(related[1].received_at, 300);
    }
}
