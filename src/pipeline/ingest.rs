/*!
 * Ingest Pipeline
 * Validation, identity, dedup, persistence, and live publication
 *
 * One synchronous pass per event: parse, fingerprint, consult the dedup
 * window, persist, hand the stack to the resolution queue, and push the
 * row to live subscribers. Only resolution happens off this path.
 */

use crate::core::errors::{IngestError, Result, SerializableError};
use crate::core::json;
use crate::core::limits::{MAX_BATCH_EVENTS, MAX_EVENT_BYTES, MAX_REPLAY_BYTES};
use crate::core::types::{now_ms, AppId, EventId, Fingerprint, Release, ReplayId};
use crate::dedup::DedupStore;
use crate::event::store::EventStore;
use crate::event::types::{
    BatchEnvelope, Envelope, EventKind, EventPayload, ResolutionStatus, StoredEvent,
};
use crate::fingerprint;
use crate::queue::{ResolveTask, TaskQueue};
use crate::replay::StoredReplay;
use crate::stack;
use crate::stream::{StreamRegistry, Topic};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

// =============================================================================
// OUTCOMES
// =============================================================================

/// Per-event result of one ingest pass
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// A new row was persisted
    Accepted {
        event_id: EventId,
        kind: EventKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        fingerprint: Option<Fingerprint>,
    },
    /// Folded into an open dedup window; no new row
    Deduplicated { event_id: EventId, count: u64 },
    /// Replay body extracted into a replay record plus a marker row
    ReplayStored {
        event_id: EventId,
        replay_id: ReplayId,
        event_count: u64,
        valid: bool,
    },
    /// Dropped; only appears inside batch outcomes
    Rejected { error: SerializableError },
}

impl IngestOutcome {
    /// Row the outcome refers to, when one exists
    pub fn event_id(&self) -> Option<EventId> {
        match self {
            IngestOutcome::Accepted { event_id, .. }
            | IngestOutcome::Deduplicated { event_id, .. }
            | IngestOutcome::ReplayStored { event_id, .. } => Some(*event_id),
            IngestOutcome::Rejected { .. } => None,
        }
    }

    /// Wire tag of the outcome, matching its serialized `status` field
    pub fn status(&self) -> &'static str {
        match self {
            IngestOutcome::Accepted { .. } => "accepted",
            IngestOutcome::Deduplicated { .. } => "deduplicated",
            IngestOutcome::ReplayStored { .. } => "replay_stored",
            IngestOutcome::Rejected { .. } => "rejected",
        }
    }
}

/// Pipeline statistics for the health endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// New rows persisted (replay markers included)
    pub accepted: u64,
    /// Occurrences folded into open windows
    pub deduplicated: u64,
    /// Events dropped by validation or storage failure
    pub rejected: u64,
    /// Replay uploads stored
    pub replays: u64,
}

// =============================================================================
// PIPELINE
// =============================================================================

/// The ingest orchestrator
pub struct IngestPipeline {
    store: Arc<dyn EventStore>,
    dedup: Arc<dyn DedupStore>,
    queue: Arc<dyn TaskQueue>,
    stream: Arc<StreamRegistry>,
    accepted: AtomicU64,
    deduplicated: AtomicU64,
    rejected: AtomicU64,
    replays: AtomicU64,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn EventStore>,
        dedup: Arc<dyn DedupStore>,
        queue: Arc<dyn TaskQueue>,
        stream: Arc<StreamRegistry>,
    ) -> Self {
        Self {
            store,
            dedup,
            queue,
            stream,
            accepted: AtomicU64::new(0),
            deduplicated: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            replays: AtomicU64::new(0),
        }
    }

    /// Ingest one event body
    pub fn ingest(&self, app_id: AppId, body: &[u8]) -> Result<IngestOutcome> {
        match self.ingest_inner(app_id, body) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Ingest a batch body, one outcome per event
    ///
    /// Envelope-level failures (malformed, empty, oversized batch) fail the
    /// whole call; per-event failures surface as `Rejected` items.
    pub fn ingest_batch(&self, app_id: AppId, body: &[u8]) -> Result<Vec<IngestOutcome>> {
        match self.ingest_batch_inner(app_id, body) {
            Ok(outcomes) => Ok(outcomes),
            Err(err) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Get pipeline statistics
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            replays: self.replays.load(Ordering::Relaxed),
        }
    }

    fn ingest_inner(&self, app_id: AppId, body: &[u8]) -> Result<IngestOutcome> {
        if body.len() > MAX_REPLAY_BYTES {
            return Err(IngestError::PayloadTooLarge {
                size: body.len(),
                limit: MAX_REPLAY_BYTES,
            }
            .into());
        }

        let envelope = parse_envelope(body)?;

        // Replays get the larger budget; everything else stays small
        if envelope.payload.kind() != EventKind::SessionReplay && body.len() > MAX_EVENT_BYTES {
            return Err(IngestError::PayloadTooLarge {
                size: body.len(),
                limit: MAX_EVENT_BYTES,
            }
            .into());
        }

        self.route(app_id, envelope)
    }

    fn ingest_batch_inner(&self, app_id: AppId, body: &[u8]) -> Result<Vec<IngestOutcome>> {
        if body.len() > MAX_REPLAY_BYTES {
            return Err(IngestError::PayloadTooLarge {
                size: body.len(),
                limit: MAX_REPLAY_BYTES,
            }
            .into());
        }

        let batch: BatchEnvelope = json::from_slice(body)
            .map_err(|err| IngestError::Malformed(err.to_string().into()))?;

        if batch.events.is_empty() {
            return Err(IngestError::Malformed("batch contains no events".into()).into());
        }
        if batch.events.len() > MAX_BATCH_EVENTS {
            return Err(IngestError::BatchTooLarge {
                count: batch.events.len(),
                limit: MAX_BATCH_EVENTS,
            }
            .into());
        }

        Ok(batch
            .events
            .into_iter()
            .map(|envelope| match self.route(app_id, envelope) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    IngestOutcome::Rejected { error: err.into() }
                }
            })
            .collect())
    }

    fn route(&self, app_id: AppId, envelope: Envelope) -> Result<IngestOutcome> {
        match envelope.payload {
            EventPayload::Error { .. } => self.process_error(app_id, envelope),
            EventPayload::SessionReplay { .. } => self.process_replay(app_id, envelope),
            _ => self.process_plain(app_id, envelope),
        }
    }

    /// Error path: fingerprint, dedup window, then persist-or-fold
    fn process_error(&self, app_id: AppId, envelope: Envelope) -> Result<IngestOutcome> {
        let (fingerprint, raw_stack) = match &envelope.payload {
            EventPayload::Error {
                error_type,
                message,
                stack,
            } => {
                let frames = stack.as_deref().map(stack::parse).unwrap_or_default();
                (
                    fingerprint::compute(error_type, message, &frames),
                    stack.clone(),
                )
            }
            _ => return self.process_plain(app_id, envelope),
        };

        let received_at = now_ms();
        let candidate = Uuid::new_v4();
        let decision = self
            .dedup
            .record_occurrence(app_id, &fingerprint, received_at, candidate);

        if !decision.is_new_window {
            // The window's head row absorbs this occurrence. The count
            // write is monotonic, so a missed write is healed by the next
            // fold in the same window.
            match self.store.update_dedup_count(decision.event_id, decision.count) {
                Ok(stored) => debug!(
                    event_id = %decision.event_id,
                    count = stored,
                    "occurrence folded into open window"
                ),
                Err(err) => warn!(
                    event_id = %decision.event_id,
                    error = %err,
                    "dedup count write failed"
                ),
            }
            self.deduplicated.fetch_add(1, Ordering::Relaxed);
            return Ok(IngestOutcome::Deduplicated {
                event_id: decision.event_id,
                count: decision.count,
            });
        }

        let mut event = StoredEvent::from_envelope(candidate, app_id, envelope, received_at);
        event.fingerprint = Some(fingerprint);
        event.dedup_count = decision.count;
        self.store.insert_event(event.clone())?;

        if event.resolution == ResolutionStatus::Pending {
            if let Some(raw_stack) = raw_stack {
                self.enqueue_resolution(candidate, app_id, raw_stack, event.release.clone());
            }
        }

        self.publish_event(&event);
        self.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(IngestOutcome::Accepted {
            event_id: candidate,
            kind: EventKind::Error,
            fingerprint: event.fingerprint.clone(),
        })
    }

    /// Replay path: extract the frame body, store it, keep a marker row
    fn process_replay(&self, app_id: AppId, mut envelope: Envelope) -> Result<IngestOutcome> {
        let (frames, declared_count, declared_duration) = match &mut envelope.payload {
            EventPayload::SessionReplay {
                events,
                event_count,
                duration_ms,
            } => (std::mem::take(events), *event_count, *duration_ms),
            _ => return self.process_plain(app_id, envelope),
        };

        let Some(replay_id) = envelope.replay_id.clone() else {
            return Err(IngestError::MissingField("replay_id".into()).into());
        };

        let received_at = now_ms();
        let replay = StoredReplay::from_frames(
            replay_id.clone(),
            app_id,
            envelope.session_id.clone(),
            frames,
            declared_count,
            declared_duration,
            received_at,
        );
        let event_count = replay.event_count;
        let valid = replay.is_valid();
        if !valid {
            warn!(
                replay_id = %replay_id,
                app_id,
                has_full_snapshot = replay.has_full_snapshot,
                has_meta = replay.has_meta,
                "replay missing required rrweb frames; playback will be degraded"
            );
        }
        self.store.put_replay(replay)?;

        // Marker row so the upload shows up in event queries; the frame
        // body lives only in the replay record
        let id = Uuid::new_v4();
        let event = StoredEvent::from_envelope(id, app_id, envelope, received_at);
        self.store.insert_event(event.clone())?;

        self.publish_event(&event);
        self.replays.fetch_add(1, Ordering::Relaxed);
        self.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(IngestOutcome::ReplayStored {
            event_id: id,
            replay_id,
            event_count,
            valid,
        })
    }

    /// Everything that is neither an error nor a replay
    fn process_plain(&self, app_id: AppId, envelope: Envelope) -> Result<IngestOutcome> {
        let received_at = now_ms();
        let id = Uuid::new_v4();
        let event = StoredEvent::from_envelope(id, app_id, envelope, received_at);
        let kind = event.kind();
        self.store.insert_event(event.clone())?;

        self.publish_event(&event);
        self.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(IngestOutcome::Accepted {
            event_id: id,
            kind,
            fingerprint: None,
        })
    }

    fn enqueue_resolution(
        &self,
        event_id: EventId,
        app_id: AppId,
        raw_stack: String,
        release: Option<Release>,
    ) {
        let task = ResolveTask::new(event_id, app_id, raw_stack, release);
        if let Err(err) = self.queue.enqueue(task) {
            // Backpressure drops resolution, never the event
            warn!(
                event_id = %event_id,
                error = %err,
                "resolution enqueue failed; raw stack stays authoritative"
            );
            if let Err(err) = self
                .store
                .update_resolution(event_id, ResolutionStatus::Failed, None)
            {
                debug!(event_id = %event_id, error = %err, "could not mark resolution failed");
            }
        }
    }

    fn publish_event(&self, event: &StoredEvent) {
        let topic = Topic::from(event.kind());
        match serde_json::to_value(event) {
            Ok(payload) => {
                self.stream.publish(event.app_id, topic, payload);
            }
            Err(err) => warn!(error = %err, "failed to serialize event for live stream"),
        }
    }
}

/// Parse one envelope, shaping the common failure modes into client errors
fn parse_envelope(body: &[u8]) -> Result<Envelope> {
    match json::from_slice::<Envelope>(body) {
        Ok(envelope) => Ok(envelope),
        Err(err) => {
            // Distinguish a bad kind discriminant from broken JSON
            if let Ok(value) = json::from_slice::<serde_json::Value>(body) {
                match value.get("kind").and_then(serde_json::Value::as_str) {
                    Some(kind) => {
                        if !EventKind::ALL.iter().any(|k| k.as_str() == kind) {
                            return Err(IngestError::UnknownKind(kind.into()).into());
                        }
                    }
                    None => return Err(IngestError::MissingField("kind".into()).into()),
                }
            }
            Err(IngestError::Malformed(err.to_string().into()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ArgusError;
    use crate::dedup::DedupCache;
    use crate::event::memory::MemoryEventStore;
    use crate::queue::MemoryTaskQueue;

    fn build() -> (
        IngestPipeline,
        Arc<MemoryEventStore>,
        Arc<MemoryTaskQueue>,
        Arc<StreamRegistry>,
    ) {
        let store = Arc::new(MemoryEventStore::new());
        let queue = Arc::new(MemoryTaskQueue::new(64));
        let stream = Arc::new(StreamRegistry::new());
        let pipeline = IngestPipeline::new(
            Arc::clone(&store) as Arc<dyn EventStore>,
            Arc::new(DedupCache::default()),
            Arc::clone(&queue) as Arc<dyn TaskQueue>,
            Arc::clone(&stream),
        );
        (pipeline, store, queue, stream)
    }

    fn error_body(message: &str) -> Vec<u8> {
        serde_json::json!({
            "kind": "error",
            "error_type": "TypeError",
            "message": message,
            "stack": format!(
                "TypeError: {message}\n    at submit (app.js:10:5)\n    at onClick (app.js:40:9)"
            ),
            "release": "1.4.2",
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_error_burst_folds_to_one_row() {
        let (pipeline, store, queue, _) = build();
        let body = error_body("x is not a function");

        let first = pipeline.ingest(1, &body).unwrap();
        let head = first.event_id().unwrap();
        assert!(matches!(first, IngestOutcome::Accepted { .. }));

        for expected in 2..=5u64 {
            match pipeline.ingest(1, &body).unwrap() {
                IngestOutcome::Deduplicated { event_id, count } => {
                    assert_eq!(event_id, head);
                    assert_eq!(count, expected);
                }
                other => panic!("expected dedup, got {other:?}"),
            }
        }

        let row = store.get_event(head).unwrap();
        assert_eq!(row.dedup_count, 5);
        assert_eq!(store.stats().events, 1);
        // Only the window-opening occurrence was queued for resolution
        assert_eq!(queue.depth(), 1);

        let stats = pipeline.stats();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.deduplicated, 4);
    }

    #[test]
    fn test_distinct_errors_open_distinct_windows() {
        let (pipeline, store, _, _) = build();
        let a = pipeline.ingest(1, &error_body("x is not a function")).unwrap();
        let b = pipeline.ingest(1, &error_body("y is undefined")).unwrap();

        let (Some(id_a), Some(id_b)) = (a.event_id(), b.event_id()) else {
            panic!("both should be accepted");
        };
        assert_ne!(id_a, id_b);
        assert_eq!(store.stats().events, 2);

        let fp_a = store.get_event(id_a).unwrap().fingerprint.unwrap();
        let fp_b = store.get_event(id_b).unwrap().fingerprint.unwrap();
        assert_ne!(fp_a, fp_b);
        assert_eq!(fp_a.len(), 64);
    }

    #[test]
    fn test_error_with_stack_is_queued_pending() {
        let (pipeline, store, queue, _) = build();
        let id = pipeline
            .ingest(1, &error_body("boom"))
            .unwrap()
            .event_id()
            .unwrap();

        let row = store.get_event(id).unwrap();
        assert_eq!(row.resolution, ResolutionStatus::Pending);
        assert!(row.fingerprint.is_some());

        let task = queue.try_dequeue().unwrap();
        assert_eq!(task.event_id, id);
        assert_eq!(task.release.as_deref(), Some("1.4.2"));
        assert!(task.raw_stack.contains("at submit"));
    }

    #[test]
    fn test_error_without_stack_skips_resolution() {
        let (pipeline, store, queue, _) = build();
        let body = serde_json::json!({
            "kind": "error",
            "error_type": "Error",
            "message": "no trace",
        })
        .to_string()
        .into_bytes();

        let id = pipeline.ingest(1, &body).unwrap().event_id().unwrap();
        assert_eq!(
            store.get_event(id).unwrap().resolution,
            ResolutionStatus::Skipped
        );
        assert_eq!(queue.depth(), 0);
    }

    #[test]
    fn test_new_window_publishes_duplicates_do_not() {
        let (pipeline, _, _, stream) = build();
        let sub = stream.subscribe(1, Topic::Errors);

        let body = error_body("boom");
        pipeline.ingest(1, &body).unwrap();
        pipeline.ingest(1, &body).unwrap();
        pipeline.ingest(1, &body).unwrap();

        let frame: serde_json::Value = serde_json::from_str(&sub.try_recv().unwrap()).unwrap();
        assert_eq!(frame["topic"], "errors");
        assert_eq!(frame["payload"]["kind"], "error");
        assert_eq!(frame["payload"]["message"], "boom");
        assert!(sub.try_recv().is_none(), "duplicates must not re-publish");
    }

    #[test]
    fn test_plain_event_routed_to_its_topic() {
        let (pipeline, _, queue, stream) = build();
        let sub = stream.subscribe(1, Topic::WebVitals);

        let body = serde_json::json!({
            "kind": "web-vital",
            "name": "LCP",
            "value": 3120.5,
        })
        .to_string()
        .into_bytes();

        match pipeline.ingest(1, &body).unwrap() {
            IngestOutcome::Accepted {
                kind, fingerprint, ..
            } => {
                assert_eq!(kind, EventKind::WebVital);
                assert!(fingerprint.is_none());
            }
            other => panic!("expected accepted, got {other:?}"),
        }

        let frame: serde_json::Value = serde_json::from_str(&sub.try_recv().unwrap()).unwrap();
        assert_eq!(frame["payload"]["name"], "LCP");
        assert_eq!(queue.depth(), 0);
    }

    #[test]
    fn test_session_and_message_kinds_land_on_stats() {
        let (pipeline, store, queue, stream) = build();
        let sub = stream.subscribe(1, Topic::Stats);

        let session = serde_json::json!({
            "kind": "session",
            "status": "start",
            "session_id": "sess-3",
        })
        .to_string()
        .into_bytes();
        let id = pipeline.ingest(1, &session).unwrap().event_id().unwrap();
        assert_eq!(store.get_event(id).unwrap().kind(), EventKind::Session);

        let message = serde_json::json!({
            "kind": "message",
            "level": "warn",
            "message": "retrying checkout request",
        })
        .to_string()
        .into_bytes();
        let id = pipeline.ingest(1, &message).unwrap().event_id().unwrap();
        let row = store.get_event(id).unwrap();
        assert_eq!(row.kind(), EventKind::Message);
        assert_eq!(row.resolution, ResolutionStatus::Skipped);

        let frame: serde_json::Value = serde_json::from_str(&sub.try_recv().unwrap()).unwrap();
        assert_eq!(frame["payload"]["kind"], "session");
        let frame: serde_json::Value = serde_json::from_str(&sub.try_recv().unwrap()).unwrap();
        assert_eq!(frame["payload"]["level"], "warn");
        assert_eq!(queue.depth(), 0);
    }

    #[test]
    fn test_replay_upload_stores_record_and_marker() {
        let (pipeline, store, _, stream) = build();
        let sub = stream.subscribe(1, Topic::Stats);

        let body = serde_json::json!({
            "kind": "session-replay",
            "replay_id": "rep-42",
            "session_id": "sess-9",
            "events": [
                {"type": 4, "timestamp": 1_000, "data": {"width": 1920}},
                {"type": 2, "timestamp": 1_050, "data": {}},
                {"type": 3, "timestamp": 2_000, "data": {}},
            ],
            "duration_ms": 1_000,
        })
        .to_string()
        .into_bytes();

        match pipeline.ingest(1, &body).unwrap() {
            IngestOutcome::ReplayStored {
                event_id,
                replay_id,
                event_count,
                valid,
            } => {
                assert_eq!(replay_id, "rep-42");
                assert_eq!(event_count, 3);
                assert!(valid);

                // Marker row exists but no longer carries the frame body
                let marker = store.get_event(event_id).unwrap();
                assert_eq!(marker.kind(), EventKind::SessionReplay);
                match &marker.payload {
                    EventPayload::SessionReplay { events, .. } => assert!(events.is_null()),
                    other => panic!("wrong marker payload: {other:?}"),
                }
            }
            other => panic!("expected replay stored, got {other:?}"),
        }

        let replay = store.get_replay(&"rep-42".to_string()).unwrap();
        assert!(replay.is_valid());
        assert_eq!(replay.session_id.as_deref(), Some("sess-9"));
        assert_eq!(replay.events.as_array().map(Vec::len), Some(3));

        let frame: serde_json::Value = serde_json::from_str(&sub.try_recv().unwrap()).unwrap();
        assert_eq!(frame["topic"], "stats");
        assert_eq!(frame["payload"]["kind"], "session-replay");
    }

    #[test]
    fn test_replay_without_id_is_rejected() {
        let (pipeline, store, _, _) = build();
        let body = serde_json::json!({
            "kind": "session-replay",
            "events": [{"type": 2, "timestamp": 1}],
        })
        .to_string()
        .into_bytes();

        let err = pipeline.ingest(1, &body).unwrap_err();
        assert!(matches!(
            err,
            ArgusError::Ingest(IngestError::MissingField(_))
        ));
        assert_eq!(store.stats().replays, 0);
        assert_eq!(pipeline.stats().rejected, 1);
    }

    #[test]
    fn test_oversized_body_rejected_before_parse() {
        let (pipeline, _, _, _) = build();
        let body = vec![b' '; MAX_REPLAY_BYTES + 1];
        let err = pipeline.ingest(1, &body).unwrap_err();
        assert!(matches!(
            err,
            ArgusError::Ingest(IngestError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_event_budget_smaller_than_replay_budget() {
        let (pipeline, _, _, _) = build();

        // A non-replay event over the event budget is dropped
        let big = "x".repeat(MAX_EVENT_BYTES + 64);
        let body = serde_json::json!({
            "kind": "error",
            "error_type": "Error",
            "message": big,
        })
        .to_string()
        .into_bytes();
        assert!(body.len() > MAX_EVENT_BYTES);
        let err = pipeline.ingest(1, &body).unwrap_err();
        assert!(matches!(
            err,
            ArgusError::Ingest(IngestError::PayloadTooLarge { limit, .. })
                if limit == MAX_EVENT_BYTES
        ));

        // A replay of the same size sails through
        let filler = "y".repeat(MAX_EVENT_BYTES);
        let body = serde_json::json!({
            "kind": "session-replay",
            "replay_id": "rep-big",
            "events": [
                {"type": 4, "timestamp": 1},
                {"type": 2, "timestamp": 2},
                {"type": 3, "timestamp": 3, "data": filler},
            ],
        })
        .to_string()
        .into_bytes();
        assert!(body.len() > MAX_EVENT_BYTES);
        assert!(matches!(
            pipeline.ingest(1, &body).unwrap(),
            IngestOutcome::ReplayStored { .. }
        ));
    }

    #[test]
    fn test_unknown_kind_and_missing_kind() {
        let (pipeline, _, _, _) = build();

        let err = pipeline
            .ingest(1, br#"{"kind":"telemetry","name":"x"}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ArgusError::Ingest(IngestError::UnknownKind(_))
        ));

        let err = pipeline.ingest(1, br#"{"name":"x"}"#).unwrap_err();
        assert!(matches!(
            err,
            ArgusError::Ingest(IngestError::MissingField(_))
        ));

        let err = pipeline.ingest(1, b"{not json").unwrap_err();
        assert!(matches!(err, ArgusError::Ingest(IngestError::Malformed(_))));
    }

    #[test]
    fn test_batch_reports_per_item_outcomes() {
        let (pipeline, store, _, _) = build();
        let body = serde_json::json!({
            "events": [
                {"kind": "error", "error_type": "TypeError", "message": "boom"},
                {"kind": "web-vital", "name": "CLS", "value": 0.02},
                {"kind": "session-replay", "events": []},
            ]
        })
        .to_string()
        .into_bytes();

        let outcomes = pipeline.ingest_batch(1, &body).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0], IngestOutcome::Accepted { .. }));
        assert!(matches!(outcomes[1], IngestOutcome::Accepted { .. }));
        match &outcomes[2] {
            IngestOutcome::Rejected { error } => {
                assert_eq!(error.error_type.as_str(), "ingest_error");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(store.stats().events, 2);
        assert_eq!(pipeline.stats().rejected, 1);
    }

    #[test]
    fn test_batch_envelope_level_failures() {
        let (pipeline, _, _, _) = build();

        let err = pipeline.ingest_batch(1, br#"{"events":[]}"#).unwrap_err();
        assert!(matches!(err, ArgusError::Ingest(IngestError::Malformed(_))));

        let events: Vec<serde_json::Value> = (0..=MAX_BATCH_EVENTS)
            .map(|i| serde_json::json!({"kind": "custom", "name": format!("e{i}")}))
            .collect();
        let body = serde_json::json!({ "events": events }).to_string().into_bytes();
        let err = pipeline.ingest_batch(1, &body).unwrap_err();
        assert!(matches!(
            err,
            ArgusError::Ingest(IngestError::BatchTooLarge { .. })
        ));
    }

    #[test]
    fn test_batch_burst_dedups_within_call() {
        let (pipeline, store, _, _) = build();
        let event = serde_json::json!({
            "kind": "error", "error_type": "TypeError", "message": "boom",
        });
        let body = serde_json::json!({ "events": [event.clone(), event.clone(), event] })
            .to_string()
            .into_bytes();

        let outcomes = pipeline.ingest_batch(1, &body).unwrap();
        assert!(matches!(outcomes[0], IngestOutcome::Accepted { .. }));
        assert!(matches!(outcomes[1], IngestOutcome::Deduplicated { count: 2, .. }));
        assert!(matches!(outcomes[2], IngestOutcome::Deduplicated { count: 3, .. }));
        assert_eq!(store.stats().events, 1);

        let head = outcomes[0].event_id().unwrap();
        assert_eq!(store.get_event(head).unwrap().dedup_count, 3);
    }
}
