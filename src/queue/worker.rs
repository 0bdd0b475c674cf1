/*!
 * Resolution Worker Pool
 * Fixed-size pool pulling tasks and applying source map resolution
 */

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::memory::MemoryTaskQueue;
use super::traits::ResolveTask;
use crate::event::store::EventStore;
use crate::event::types::ResolutionStatus;
use crate::observe::ResolveSpan;
use crate::stack::{parse, FrameResolver};
use serde::{Deserialize, Serialize};

/// Point-in-time worker statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerStats {
    pub workers: usize,
    /// Tasks that reached a final outcome (resolved or definitively failed)
    pub processed: u64,
    /// Tasks put back for another attempt
    pub retried: u64,
    /// Tasks that exhausted their attempts
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
}

/// Fixed-size resolution worker pool
///
/// Workers run as detached tokio tasks for the process lifetime; a failed
/// task is put back on the queue after a delay until its attempts are
/// exhausted, then marked failed so the raw stack stays authoritative.
pub struct WorkerPool {
    handles: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    workers: usize,
}

impl WorkerPool {
    /// Spawn `workers` consumers over the queue
    pub fn spawn(
        workers: usize,
        queue: Arc<MemoryTaskQueue>,
        store: Arc<dyn EventStore>,
        resolver: FrameResolver,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        let counters = Arc::new(Counters::default());
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let store = Arc::clone(&store);
            let resolver = resolver.clone();
            let counters = Arc::clone(&counters);

            handles.push(tokio::spawn(async move {
                tracing::debug!(worker_id, "resolution worker started");
                while let Some(task) = queue.dequeue().await {
                    process_task(
                        &queue,
                        store.as_ref(),
                        &resolver,
                        &counters,
                        task,
                        max_attempts,
                        retry_delay,
                    );
                }
                tracing::debug!(worker_id, "resolution worker stopped");
            }));
        }

        Self {
            handles: Mutex::new(handles),
            counters,
            workers,
        }
    }

    /// Point-in-time statistics
    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            workers: self.workers,
            processed: self.counters.processed.load(Ordering::Relaxed),
            retried: self.counters.retried.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Abort all workers
    pub fn shutdown(&self) {
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

/// Run one task to an outcome: final update, or delayed requeue
fn process_task(
    queue: &Arc<MemoryTaskQueue>,
    store: &dyn EventStore,
    resolver: &FrameResolver,
    counters: &Counters,
    task: ResolveTask,
    max_attempts: u32,
    retry_delay: Duration,
) {
    let span = ResolveSpan::new(task.event_id, task.attempt);
    let _guard = span.enter();

    let frames = parse(&task.raw_stack);
    if frames.is_empty() {
        // Nothing parsable; the raw stack stays authoritative
        span.record_result("failed");
        finish(
            queue,
            store,
            counters,
            &task,
            ResolutionStatus::Failed,
            None,
        );
        return;
    }

    let outcome = resolver.resolve(task.app_id, task.release.as_deref(), &frames);
    let text = outcome.to_stack_text();
    tracing::debug!(
        event_id = %task.event_id,
        mapped = outcome.mapped,
        fallback = outcome.fallback,
        "stack resolved"
    );

    match store.update_resolution(task.event_id, ResolutionStatus::Resolved, Some(text)) {
        Ok(()) => {
            span.record_result("resolved");
            queue.release(&task.event_id);
            counters.processed.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            let next = task.attempt + 1;
            if next >= max_attempts {
                tracing::warn!(
                    event_id = %task.event_id,
                    error = %e,
                    attempts = next,
                    "resolution attempts exhausted"
                );
                span.record_result("failed");
                finish(
                    queue,
                    store,
                    counters,
                    &task,
                    ResolutionStatus::Failed,
                    None,
                );
            } else {
                tracing::debug!(event_id = %task.event_id, error = %e, attempt = next, "resolution store write failed, retrying");
                span.record_result("retried");
                counters.retried.fetch_add(1, Ordering::Relaxed);
                let queue = Arc::clone(queue);
                let retry = task.next_attempt();
                tokio::spawn(async move {
                    tokio::time::sleep(retry_delay).await;
                    if let Err(e) = queue.requeue(retry) {
                        tracing::warn!(error = %e, "retry requeue failed");
                    }
                });
            }
        }
    }
}

/// Record a definitive outcome and release the task's event id
fn finish(
    queue: &Arc<MemoryTaskQueue>,
    store: &dyn EventStore,
    counters: &Counters,
    task: &ResolveTask,
    status: ResolutionStatus,
    resolved_stack: Option<String>,
) {
    if let Err(e) = store.update_resolution(task.event_id, status, resolved_stack) {
        tracing::debug!(event_id = %task.event_id, error = %e, "final resolution update skipped");
    }
    queue.release(&task.event_id);
    counters.processed.fetch_add(1, Ordering::Relaxed);
    if status == ResolutionStatus::Failed {
        counters.failed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::memory::MemoryEventStore;
    use crate::event::types::{Envelope, EventPayload, StoredEvent};
    use crate::queue::traits::TaskQueue;
    use crate::sourcemap::{RawSourceMap, SourceMapRegistry};
    use bytes::Bytes;
    use uuid::Uuid;

    fn stored_error(store: &MemoryEventStore, stack: &str) -> StoredEvent {
        let envelope = Envelope {
            payload: EventPayload::Error {
                error_type: "TypeError".into(),
                message: "boom".to_string(),
                stack: Some(stack.to_string()),
            },
            session_id: None,
            replay_id: None,
            release: Some("2.0.0".to_string()),
            url: None,
            user_agent: None,
            timestamp: None,
        };
        let event = StoredEvent::from_envelope(Uuid::new_v4(), 7, envelope, 1_000);
        store.insert_event(event.clone()).unwrap();
        event
    }

    fn resolver_with_map() -> FrameResolver {
        let map = RawSourceMap {
            version: 3,
            sources: vec!["src/checkout.ts".to_string()],
            names: vec![],
            mappings: "AAAA".to_string(),
            source_root: None,
            file: None,
            sources_content: None,
        };
        let registry = SourceMapRegistry::default();
        registry
            .store(
                7,
                "2.0.0",
                "app.js.map",
                None,
                Bytes::from(serde_json::to_vec(&map).unwrap()),
            )
            .unwrap();
        FrameResolver::new(Arc::new(registry))
    }

    async fn drain(pool: &WorkerPool, queue: &MemoryTaskQueue, expect_processed: u64) {
        for _ in 0..200 {
            if queue.depth() == 0 && pool.stats().processed >= expect_processed {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("worker pool did not drain");
    }

    #[tokio::test]
    async fn test_worker_resolves_pending_event() {
        let store = Arc::new(MemoryEventStore::new());
        let queue = Arc::new(MemoryTaskQueue::new(16));
        let pool = WorkerPool::spawn(
            2,
            Arc::clone(&queue),
            store.clone() as Arc<dyn EventStore>,
            resolver_with_map(),
            3,
            Duration::from_millis(10),
        );

        let event = stored_error(&store, "TypeError: boom\n    at t (app.js:1:1)");
        queue
            .enqueue(ResolveTask::new(
                event.id,
                7,
                "TypeError: boom\n    at t (app.js:1:1)".to_string(),
                Some("2.0.0".to_string()),
            ))
            .unwrap();

        drain(&pool, &queue, 1).await;

        let resolved = store.get_event(event.id).unwrap();
        assert_eq!(resolved.resolution, ResolutionStatus::Resolved);
        let text = resolved.resolved_stack.unwrap();
        assert!(text.contains("src/checkout.ts:1:1"), "got: {text}");
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_worker_fails_unparsable_stack() {
        let store = Arc::new(MemoryEventStore::new());
        let queue = Arc::new(MemoryTaskQueue::new(16));
        let pool = WorkerPool::spawn(
            1,
            Arc::clone(&queue),
            store.clone() as Arc<dyn EventStore>,
            resolver_with_map(),
            3,
            Duration::from_millis(10),
        );

        let event = stored_error(&store, "no frames here");
        queue
            .enqueue(ResolveTask::new(
                event.id,
                7,
                "no frames here".to_string(),
                None,
            ))
            .unwrap();

        drain(&pool, &queue, 1).await;

        let after = store.get_event(event.id).unwrap();
        assert_eq!(after.resolution, ResolutionStatus::Failed);
        assert!(after.resolved_stack.is_none());
        assert_eq!(pool.stats().failed, 1);
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_worker_retries_until_attempts_exhausted() {
        let store = Arc::new(MemoryEventStore::new());
        let queue = Arc::new(MemoryTaskQueue::new(16));
        let pool = WorkerPool::spawn(
            1,
            Arc::clone(&queue),
            store.clone() as Arc<dyn EventStore>,
            resolver_with_map(),
            3,
            Duration::from_millis(5),
        );

        // Event never inserted: every store update misses
        let ghost = Uuid::new_v4();
        queue
            .enqueue(ResolveTask::new(
                ghost,
                7,
                "    at t (app.js:1:1)".to_string(),
                None,
            ))
            .unwrap();

        for _ in 0..200 {
            if pool.stats().failed >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let stats = pool.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.retried, 2);
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_worker_falls_back_without_map() {
        let store = Arc::new(MemoryEventStore::new());
        let queue = Arc::new(MemoryTaskQueue::new(16));
        let pool = WorkerPool::spawn(
            1,
            Arc::clone(&queue),
            store.clone() as Arc<dyn EventStore>,
            FrameResolver::new(Arc::new(SourceMapRegistry::default())),
            3,
            Duration::from_millis(10),
        );

        let stack = "    at t (vendor.js:3:9)";
        let event = stored_error(&store, stack);
        queue
            .enqueue(ResolveTask::new(
                event.id,
                7,
                stack.to_string(),
                Some("2.0.0".to_string()),
            ))
            .unwrap();

        drain(&pool, &queue, 1).await;

        let after = store.get_event(event.id).unwrap();
        assert_eq!(after.resolution, ResolutionStatus::Resolved);
        // Original frame text carried through unchanged
        assert_eq!(after.resolved_stack.as_deref(), Some(stack));
        pool.shutdown();
    }
}
