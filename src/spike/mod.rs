/*!
 * Spike Detection
 * Baseline-relative error-rate monitoring and alerting
 */

pub mod detector;
pub mod monitor;

pub use detector::{SpikeAlert, SpikeDetector, SpikeSeverity, SpikeSnapshot, SpikeStats};
pub use monitor::SpikeMonitor;
