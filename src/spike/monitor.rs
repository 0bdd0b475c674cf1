/*!
 * Spike Monitor
 * Periodic spike evaluation with live alert publication
 */

use crate::core::limits::DEFAULT_SPIKE_INTERVAL;
use crate::spike::detector::SpikeDetector;
use crate::stream::{StreamRegistry, Topic};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Background task re-evaluating spikes and pushing new alerts
pub struct SpikeMonitor {
    handle: JoinHandle<()>,
}

impl SpikeMonitor {
    /// Spawn the evaluation loop with the default interval
    pub fn spawn(detector: Arc<SpikeDetector>, stream: Arc<StreamRegistry>) -> Self {
        Self::spawn_every(detector, stream, DEFAULT_SPIKE_INTERVAL)
    }

    /// Spawn the evaluation loop with a custom interval
    pub fn spawn_every(
        detector: Arc<SpikeDetector>,
        stream: Arc<StreamRegistry>,
        every: Duration,
    ) -> Self {
        info!(interval_ms = every.as_millis() as u64, "spike monitor started");
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // Consume the immediate first tick so the first evaluation
            // sees a full window of data
            ticker.tick().await;
            loop {
                ticker.tick().await;
                for alert in detector.refresh() {
                    warn!(
                        app_id = alert.app_id,
                        fingerprint = %alert.fingerprint,
                        current = alert.current_count,
                        baseline = alert.baseline_count,
                        ratio = alert.ratio,
                        severity = %alert.severity,
                        "error spike detected"
                    );
                    if let Ok(payload) = serde_json::to_value(&alert) {
                        stream.publish(alert.app_id, Topic::Spikes, payload);
                    }
                }
            }
        });
        Self { handle }
    }

    /// Stop the evaluation loop
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for SpikeMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
