/*!
 * In-Memory Task Queue
 * Bounded channel-backed queue with enqueue-time dedupe
 */

use ahash::RandomState;
use dashmap::DashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::traits::{QueueError, QueueResult, QueueStats, ResolveTask, TaskQueue};
use crate::core::limits::RESOLVE_QUEUE_CAPACITY;
use crate::core::types::EventId;

/// In-memory resolution queue
///
/// A bounded flume channel carries tasks to the worker pool; a pending-id
/// set drops duplicate enqueues for an event that already has a task in
/// flight. Ids stay marked across retries and are released only when the
/// worker reaches a final outcome.
#[derive(Clone)]
pub struct MemoryTaskQueue {
    tx: flume::Sender<ResolveTask>,
    rx: flume::Receiver<ResolveTask>,
    pending_ids: Arc<DashSet<EventId, RandomState>>,
    capacity: usize,
    enqueued: Arc<AtomicU64>,
    deduped: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
}

impl MemoryTaskQueue {
    /// Create new queue with the given capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = flume::bounded(capacity);
        Self {
            tx,
            rx,
            pending_ids: Arc::new(DashSet::with_hasher(RandomState::new())),
            capacity,
            enqueued: Arc::new(AtomicU64::new(0)),
            deduped: Arc::new(AtomicU64::new(0)),
            rejected: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait for the next task; None once the queue is closed
    pub async fn dequeue(&self) -> Option<ResolveTask> {
        self.rx.recv_async().await.ok()
    }

    /// Non-blocking dequeue (tests and drain loops)
    pub fn try_dequeue(&self) -> Option<ResolveTask> {
        self.rx.try_recv().ok()
    }

    /// Put a retried task back without the duplicate check
    ///
    /// The event id is still marked pending, so `enqueue` would drop it.
    pub fn requeue(&self, task: ResolveTask) -> QueueResult<()> {
        self.push(task)
    }

    /// Unmark an event id once its task reached a final outcome
    pub fn release(&self, event_id: &EventId) {
        self.pending_ids.remove(event_id);
    }

    fn push(&self, task: ResolveTask) -> QueueResult<()> {
        match self.tx.try_send(task) {
            Ok(()) => Ok(()),
            Err(flume::TrySendError::Full(task)) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                self.pending_ids.remove(&task.event_id);
                Err(QueueError::Full {
                    capacity: self.capacity,
                })
            }
            Err(flume::TrySendError::Disconnected(task)) => {
                self.pending_ids.remove(&task.event_id);
                Err(QueueError::Closed)
            }
        }
    }
}

impl Default for MemoryTaskQueue {
    fn default() -> Self {
        Self::new(RESOLVE_QUEUE_CAPACITY)
    }
}

impl TaskQueue for MemoryTaskQueue {
    fn enqueue(&self, task: ResolveTask) -> QueueResult<()> {
        if !self.pending_ids.insert(task.event_id) {
            self.deduped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(event_id = %task.event_id, "resolution already pending, enqueue dropped");
            return Ok(());
        }
        self.push(task)?;
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn depth(&self) -> usize {
        self.rx.len()
    }

    fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.rx.len(),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            deduped: self.deduped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
