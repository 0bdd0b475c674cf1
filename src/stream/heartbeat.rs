/*!
 * Stream Heartbeat
 * Periodic keepalive frames for idle subscriber connections
 */

use crate::core::limits::DEFAULT_HEARTBEAT_INTERVAL;
use crate::stream::registry::StreamRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, trace};

/// Background task pushing heartbeat frames to every subscriber
pub struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawn the heartbeat loop with the default interval
    pub fn spawn(registry: Arc<StreamRegistry>) -> Self {
        Self::spawn_every(registry, DEFAULT_HEARTBEAT_INTERVAL)
    }

    /// Spawn the heartbeat loop with a custom interval
    pub fn spawn_every(registry: Arc<StreamRegistry>, every: Duration) -> Self {
        info!(interval_ms = every.as_millis() as u64, "heartbeat task started");
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; consume it so the
            // first beat lands one full interval after startup
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let sent = registry.heartbeat();
                trace!(sent, "heartbeat fanned out");
            }
        });
        Self { handle }
    }

    /// Stop the heartbeat loop
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
