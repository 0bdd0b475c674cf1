/*!
 * Event Model
 * Strongly-typed telemetry events ingested from browser SDKs
 */

use crate::core::data_structures::InlineString;
use crate::core::types::{
    AppId, EventId, Fingerprint, Release, ReplayId, SessionId, TimestampMs,
};
use serde::{Deserialize, Serialize};

/// Event kind for routing and querying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum EventKind {
    Error,
    Performance,
    WebVital,
    Session,
    SessionReplay,
    Message,
    Custom,
}

impl EventKind {
    /// All kinds, wire order
    pub const ALL: [EventKind; 7] = [
        EventKind::Error,
        EventKind::Performance,
        EventKind::WebVital,
        EventKind::Session,
        EventKind::SessionReplay,
        EventKind::Message,
        EventKind::Custom,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Error => "error",
            EventKind::Performance => "performance",
            EventKind::WebVital => "web-vital",
            EventKind::Session => "session",
            EventKind::SessionReplay => "session-replay",
            EventKind::Message => "message",
            EventKind::Custom => "custom",
        }
    }
}

/// Session lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Start,
    End,
}

/// Console/message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum MessageLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

/// Event payload - strongly typed variants for each event kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EventPayload {
    /// Uncaught exception or rejected promise
    Error {
        /// Error class name (`TypeError`, `ChunkLoadError`, ...)
        error_type: InlineString,
        message: String,
        /// Raw stack trace text as thrown in the browser
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },

    /// User-timing mark or measure
    Performance {
        name: InlineString,
        duration_ms: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_time_ms: Option<f64>,
    },

    /// Core Web Vital sample (LCP, CLS, INP, ...)
    WebVital {
        name: InlineString,
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rating: Option<InlineString>,
    },

    /// Session lifecycle marker
    Session { status: SessionStatus },

    /// Recorded replay upload: rrweb frame array plus declared totals
    ///
    /// The pipeline extracts `events` into a replay record and persists the
    /// rest as a marker row, so the frame body never sits in the event store.
    SessionReplay {
        #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
        events: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_count: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },

    /// Captured console/log message
    Message {
        level: MessageLevel,
        message: String,
    },

    /// Application-defined event
    Custom {
        name: InlineString,
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl EventPayload {
    /// Kind discriminant for routing
    #[inline]
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Error { .. } => EventKind::Error,
            EventPayload::Performance { .. } => EventKind::Performance,
            EventPayload::WebVital { .. } => EventKind::WebVital,
            EventPayload::Session { .. } => EventKind::Session,
            EventPayload::SessionReplay { .. } => EventKind::SessionReplay,
            EventPayload::Message { .. } => EventKind::Message,
            EventPayload::Custom { .. } => EventKind::Custom,
        }
    }

    /// Raw stack trace text, if this payload carries one
    #[inline]
    pub fn stack(&self) -> Option<&str> {
        match self {
            EventPayload::Error { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }
}

/// Wire envelope: one event as sent by the SDK
///
/// The payload enum is flattened so the SDK sends a flat object with a
/// `kind` discriminant next to the shared context fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub payload: EventPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_id: Option<ReplayId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<Release>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Client-side `Date.now()` at capture time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<TimestampMs>,
}

/// Batch envelope: several events flushed together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEnvelope {
    pub events: Vec<Envelope>,
}

/// Stack resolution lifecycle of a stored event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStatus {
    /// Not an error, or no stack attached
    Skipped,
    /// Queued for source map resolution
    Pending,
    /// Frames translated (possibly with per-frame fallbacks)
    Resolved,
    /// All attempts exhausted; raw frames remain authoritative
    Failed,
}

/// A persisted telemetry event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: EventId,
    pub app_id: AppId,
    #[serde(flatten)]
    pub payload: EventPayload,
    /// Stable error-class identity; only errors carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    /// Occurrences folded into this row by the dedup window
    pub dedup_count: u64,
    pub resolution: ResolutionStatus,
    /// Source-mapped stack text, one resolved-or-original line per frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_id: Option<ReplayId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<Release>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Client capture time, when the SDK supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<TimestampMs>,
    /// Server receive time; windows and queries key off this
    pub received_at: TimestampMs,
}

impl StoredEvent {
    /// Build a stored row from a validated envelope
    pub fn from_envelope(
        id: EventId,
        app_id: AppId,
        envelope: Envelope,
        received_at: TimestampMs,
    ) -> Self {
        let resolution = if envelope.payload.stack().is_some() {
            ResolutionStatus::Pending
        } else {
            ResolutionStatus::Skipped
        };
        Self {
            id,
            app_id,
            payload: envelope.payload,
            fingerprint: None,
            dedup_count: 1,
            resolution,
            resolved_stack: None,
            session_id: envelope.session_id,
            replay_id: envelope.replay_id,
            release: envelope.release,
            url: envelope.url,
            user_agent: envelope.user_agent,
            client_timestamp: envelope.timestamp,
            received_at,
        }
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.kind() == EventKind::Error
    }

    /// Condensed view for list endpoints and replay correlation
    pub fn summary(&self) -> EventSummary {
        let (error_type, message) = match &self.payload {
            EventPayload::Error {
                error_type,
                message,
                ..
            } => (Some(error_type.clone()), Some(message.clone())),
            EventPayload::Message { message, .. } => (None, Some(message.clone())),
            _ => (None, None),
        };
        EventSummary {
            id: self.id,
            kind: self.kind(),
            error_type,
            message,
            fingerprint: self.fingerprint.clone(),
            dedup_count: self.dedup_count,
            resolution: self.resolution,
            received_at: self.received_at,
        }
    }

    /// Check if event matches filter criteria
    #[inline]
    pub fn matches(&self, filter: &EventFilter) -> bool {
        if let Some(kind) = filter.kind {
            if self.kind() != kind {
                return false;
            }
        }

        if let Some(fingerprint) = &filter.fingerprint {
            if self.fingerprint.as_ref() != Some(fingerprint) {
                return false;
            }
        }

        if let Some(since) = filter.since_ms {
            if self.received_at < since {
                return false;
            }
        }

        if let Some(until) = filter.until_ms {
            if self.received_at >= until {
                return false;
            }
        }

        true
    }
}

/// Condensed event view for list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<InlineString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    pub dedup_count: u64,
    pub resolution: ResolutionStatus,
    pub received_at: TimestampMs,
}

/// Event filter for store queries
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    pub fingerprint: Option<Fingerprint>,
    pub since_ms: Option<TimestampMs>,
    pub until_ms: Option<TimestampMs>,
    pub limit: Option<usize>,
}

impl EventFilter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[inline]
    pub fn fingerprint(mut self, fingerprint: impl Into<Fingerprint>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    #[inline]
    pub fn since(mut self, since_ms: TimestampMs) -> Self {
        self.since_ms = Some(since_ms);
        self
    }

    #[inline]
    pub fn until(mut self, until_ms: TimestampMs) -> Self {
        self.until_ms = Some(until_ms);
        self
    }

    #[inline]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
