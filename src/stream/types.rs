/*!
 * Stream Types
 * Topics and wire messages for the live distribution layer
 */

use crate::core::types::TimestampMs;
use crate::event::EventKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// TOPICS
// =============================================================================

/// Named channel a subscriber attaches to within one application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// New error windows (duplicates within a window are not re-published)
    Errors,
    /// Performance measurements
    Performance,
    /// Web vitals readings
    WebVitals,
    /// Session lifecycle, replays, messages, custom events
    Stats,
    /// Spike detector alerts
    Spikes,
}

impl Topic {
    /// All topics, in publication order
    pub const ALL: [Topic; 5] = [
        Topic::Errors,
        Topic::Performance,
        Topic::WebVitals,
        Topic::Stats,
        Topic::Spikes,
    ];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Errors => "errors",
            Topic::Performance => "performance",
            Topic::WebVitals => "web-vitals",
            Topic::Stats => "stats",
            Topic::Spikes => "spikes",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "errors" => Ok(Topic::Errors),
            "performance" => Ok(Topic::Performance),
            "web-vitals" => Ok(Topic::WebVitals),
            "stats" => Ok(Topic::Stats),
            "spikes" => Ok(Topic::Spikes),
            _ => Err(()),
        }
    }
}

impl From<EventKind> for Topic {
    /// Every ingested kind lands on exactly one topic
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Error => Topic::Errors,
            EventKind::Performance => Topic::Performance,
            EventKind::WebVital => Topic::WebVitals,
            EventKind::Session
            | EventKind::SessionReplay
            | EventKind::Message
            | EventKind::Custom => Topic::Stats,
        }
    }
}

// =============================================================================
// WIRE MESSAGES
// =============================================================================

/// Frame pushed to subscribers, tagged so clients can switch on `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// An event or alert on a topic
    Data {
        topic: Topic,
        payload: serde_json::Value,
        ts: TimestampMs,
    },
    /// Keepalive for idle connections
    Heartbeat { ts: TimestampMs },
}

impl StreamMessage {
    pub fn data(topic: Topic, payload: serde_json::Value, ts: TimestampMs) -> Self {
        StreamMessage::Data { topic, payload, ts }
    }

    pub fn heartbeat(ts: TimestampMs) -> Self {
        StreamMessage::Heartbeat { ts }
    }
}
