/*!
 * Replay Module
 * Recording storage model and error correlation
 */

pub mod correlator;
pub mod types;

pub use correlator::{CorrelatorStats, ReplayCorrelator};
pub use types::{StoredReplay, FULL_SNAPSHOT_TYPE, META_TYPE};
