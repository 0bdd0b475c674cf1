/*!
 * Live Streaming
 * Per-(app, topic) fan-out of events, alerts, and heartbeats
 */

pub mod heartbeat;
pub mod registry;
pub mod types;

pub use heartbeat::Heartbeat;
pub use registry::{StreamRegistry, StreamStats, StreamSubscription, SubscriberId};
pub use types::{StreamMessage, Topic};
