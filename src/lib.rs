/*!
 * Argus Library
 * Browser telemetry ingestion pipeline exposed as a library
 */

pub mod api;
pub mod core;
pub mod dedup;
pub mod event;
pub mod fingerprint;
pub mod observe;
pub mod pipeline;
pub mod queue;
pub mod replay;
pub mod sourcemap;
pub mod spike;
pub mod stack;
pub mod stream;

// Re-exports
pub use crate::core::{ArgusError, Config, Result};
pub use api::{router, serve, AppState};
pub use dedup::DedupCache;
pub use event::MemoryEventStore;
pub use observe::init_tracing;
pub use pipeline::{IngestOutcome, IngestPipeline};
pub use queue::{MemoryTaskQueue, WorkerPool};
pub use replay::ReplayCorrelator;
pub use sourcemap::SourceMapRegistry;
pub use spike::{SpikeDetector, SpikeMonitor};
pub use stack::FrameResolver;
pub use stream::{Heartbeat, StreamRegistry};
