/*!
 * Stream Registry
 * Fan-out of live events to per-(app, topic) subscribers
 *
 * Design: publishers serialize a message once into an `Arc<String>` and
 * push clones to every subscriber channel. Channels are bounded; a full
 * or broken channel drops the frame for that subscriber only, never
 * stalling ingest or other subscribers.
 */

use crate::core::json::serialize_stream_message;
use crate::core::limits::SUBSCRIBER_CHANNEL_CAPACITY;
use crate::core::types::{now_ms, AppId};
use crate::stream::types::{StreamMessage, Topic};
use ahash::RandomState;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Unique handle for one attached subscriber
pub type SubscriberId = Uuid;

type ChannelMap = HashMap<SubscriberId, flume::Sender<Arc<String>>>;

/// Registry statistics for the health endpoint
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StreamStats {
    pub subscribers: usize,
    pub topics: usize,
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub heartbeats: u64,
}

/// Live distribution registry
pub struct StreamRegistry {
    /// Subscriber channels keyed by (application, topic)
    channels: DashMap<(AppId, Topic), ChannelMap, RandomState>,

    /// Per-subscriber channel capacity
    capacity: usize,

    /// Statistics
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    heartbeats: AtomicU64,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::with_capacity(SUBSCRIBER_CHANNEL_CAPACITY)
    }

    /// Create a registry with a custom per-subscriber channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::with_hasher(RandomState::new()),
            capacity,
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            heartbeats: AtomicU64::new(0),
        }
    }

    /// Attach a subscriber to one (application, topic) pair
    ///
    /// The returned subscription detaches itself when dropped.
    pub fn subscribe(self: &Arc<Self>, app_id: AppId, topic: Topic) -> StreamSubscription {
        let id = Uuid::new_v4();
        let (tx, rx) = flume::bounded(self.capacity);
        self.channels
            .entry((app_id, topic))
            .or_default()
            .insert(id, tx);
        debug!(app_id, topic = %topic, subscriber = %id, "stream subscriber attached");
        StreamSubscription {
            registry: Arc::clone(self),
            app_id,
            topic,
            id,
            rx,
        }
    }

    /// Detach one subscriber; drops the (app, topic) entry once empty
    fn unsubscribe(&self, app_id: AppId, topic: Topic, id: SubscriberId) {
        let key = (app_id, topic);
        if let Some(mut map) = self.channels.get_mut(&key) {
            map.remove(&id);
        }
        self.channels.remove_if(&key, |_, map| map.is_empty());
        debug!(app_id, topic = %topic, subscriber = %id, "stream subscriber detached");
    }

    /// Publish a payload to every subscriber of (app, topic)
    ///
    /// Serializes once, fans out clones. Returns the number of
    /// subscribers the frame was delivered to; zero subscribers is a
    /// no-op and skips serialization entirely.
    pub fn publish(&self, app_id: AppId, topic: Topic, payload: serde_json::Value) -> usize {
        let targets = self.snapshot(&(app_id, topic));
        if targets.is_empty() {
            return 0;
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        let message = StreamMessage::data(topic, payload, now_ms());
        let frame = Arc::new(serialize_stream_message(&message));
        self.fan_out(app_id, topic, targets, &frame)
    }

    /// Push one heartbeat frame to every subscriber on every topic
    ///
    /// Returns the number of subscribers reached.
    pub fn heartbeat(&self) -> usize {
        let keys: Vec<(AppId, Topic)> = self.channels.iter().map(|entry| *entry.key()).collect();
        if keys.is_empty() {
            return 0;
        }

        self.heartbeats.fetch_add(1, Ordering::Relaxed);
        let frame = Arc::new(serialize_stream_message(&StreamMessage::heartbeat(now_ms())));

        let mut sent = 0;
        for (app_id, topic) in keys {
            let targets = self.snapshot(&(app_id, topic));
            sent += self.fan_out(app_id, topic, targets, &frame);
        }
        sent
    }

    /// Clone the senders for one key out of the shard lock
    fn snapshot(&self, key: &(AppId, Topic)) -> Vec<(SubscriberId, flume::Sender<Arc<String>>)> {
        match self.channels.get(key) {
            Some(map) => map.iter().map(|(id, tx)| (*id, tx.clone())).collect(),
            None => Vec::new(),
        }
    }

    /// Try-send a frame to each target, pruning disconnected channels
    fn fan_out(
        &self,
        app_id: AppId,
        topic: Topic,
        targets: Vec<(SubscriberId, flume::Sender<Arc<String>>)>,
        frame: &Arc<String>,
    ) -> usize {
        let mut sent = 0;
        let mut disconnected = Vec::new();

        for (id, tx) in targets {
            match tx.try_send(Arc::clone(frame)) {
                Ok(()) => {
                    sent += 1;
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(flume::TrySendError::Full(_)) => {
                    // Slow consumer: drop this frame for them only
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(flume::TrySendError::Disconnected(_)) => {
                    disconnected.push(id);
                }
            }
        }

        if !disconnected.is_empty() {
            let key = (app_id, topic);
            if let Some(mut map) = self.channels.get_mut(&key) {
                for id in &disconnected {
                    map.remove(id);
                }
            }
            self.channels.remove_if(&key, |_, map| map.is_empty());
            debug!(
                app_id,
                topic = %topic,
                pruned = disconnected.len(),
                "pruned disconnected stream subscribers"
            );
        }

        sent
    }

    /// Total attached subscribers across all topics
    pub fn subscriber_count(&self) -> usize {
        self.channels.iter().map(|entry| entry.value().len()).sum()
    }

    /// Get registry statistics
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            subscribers: self.subscriber_count(),
            topics: self.channels.len(),
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
        }
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SUBSCRIPTION HANDLE
// =============================================================================

/// One subscriber's end of the stream; detaches on drop
pub struct StreamSubscription {
    registry: Arc<StreamRegistry>,
    app_id: AppId,
    topic: Topic,
    id: SubscriberId,
    rx: flume::Receiver<Arc<String>>,
}

impl StreamSubscription {
    /// Wait for the next frame; `None` once detached
    pub async fn recv(&self) -> Option<Arc<String>> {
        self.rx.recv_async().await.ok()
    }

    /// Non-blocking receive
    pub fn try_recv(&self) -> Option<Arc<String>> {
        self.rx.try_recv().ok()
    }

    #[inline]
    pub fn topic(&self) -> Topic {
        self.topic
    }

    #[inline]
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.app_id, self.topic, self.id);
    }
}
