/*!
 * Task Queue Abstraction
 * Resolution task shape and the producer-side queue contract
 */

use crate::core::types::{AppId, EventId, Release};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queue errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum QueueError {
    #[error("Queue full: {capacity} tasks pending")]
    #[diagnostic(
        code(queue::full),
        help("Resolution is falling behind ingestion. Add workers or raise the queue capacity.")
    )]
    Full { capacity: usize },

    #[error("Queue closed")]
    #[diagnostic(
        code(queue::closed),
        help("The queue was shut down; no further tasks are accepted.")
    )]
    Closed,
}

/// Result type for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// One unit of resolution work
///
/// This is the wire shape a durable broker would carry; the in-memory queue
/// moves it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveTask {
    pub event_id: EventId,
    pub app_id: AppId,
    pub raw_stack: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<Release>,
    /// Delivery attempts so far (0 on first enqueue)
    #[serde(default)]
    pub attempt: u32,
}

impl ResolveTask {
    pub fn new(
        event_id: EventId,
        app_id: AppId,
        raw_stack: String,
        release: Option<Release>,
    ) -> Self {
        Self {
            event_id,
            app_id,
            raw_stack,
            release,
            attempt: 0,
        }
    }

    /// Copy of this task with the attempt counter advanced
    pub fn next_attempt(mut self) -> Self {
        self.attempt += 1;
        self
    }
}

/// Point-in-time queue statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks waiting for a worker
    pub pending: usize,
    /// Tasks accepted since start
    pub enqueued: u64,
    /// Enqueue calls dropped because the event already had a pending task
    pub deduped: u64,
    /// Enqueue calls rejected because the queue was full
    pub rejected: u64,
}

/// Producer-side queue contract
///
/// Workers pull from the concrete backend; the pipeline only needs to hand
/// tasks over. At-least-once delivery: an accepted task is processed until
/// it succeeds or exhausts its attempts.
pub trait TaskQueue: Send + Sync {
    /// Hand a task to the queue
    ///
    /// Idempotent per event id: a second enqueue while the first task is
    /// still pending is dropped (Ok) rather than queued twice.
    fn enqueue(&self, task: ResolveTask) -> QueueResult<()>;

    /// Tasks currently waiting for a worker
    fn depth(&self) -> usize;

    /// Point-in-time statistics
    fn stats(&self) -> QueueStats;

    /// Backend name for diagnostics
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_queue_error_serialization() {
        let error = QueueError::Full { capacity: 10_000 };
        let json = serde_json::to_string(&error).unwrap();
        let deserialized: QueueError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn test_task_attempt_advances() {
        let task = ResolveTask::new(Uuid::new_v4(), 1, "at f (a.js:1:2)".to_string(), None);
        assert_eq!(task.attempt, 0);
        let retried = task.next_attempt().next_attempt();
        assert_eq!(retried.attempt, 2);
    }
}
