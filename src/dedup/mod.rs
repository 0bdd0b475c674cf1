/*!
 * Deduplication Module
 * Sliding-window occurrence folding keyed by (app, fingerprint)
 */

pub mod cache;
pub mod traits;

pub use cache::DedupCache;
pub use traits::{DedupDecision, DedupStats, DedupStore};
