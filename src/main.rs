/*!
 * argusd - Main Entry Point
 *
 * Browser telemetry ingestion daemon:
 * - Event ingestion with fingerprinting and burst dedup
 * - Async source map resolution
 * - Session replay correlation
 * - Spike detection and live streaming
 */

use argus::api::{serve, AppState};
use argus::core::types::now_ms;
use argus::core::Config;
use argus::dedup::{DedupCache, DedupStore};
use argus::event::{EventStore, MemoryEventStore};
use argus::observe::init_tracing;
use argus::pipeline::IngestPipeline;
use argus::queue::{MemoryTaskQueue, TaskQueue, WorkerPool};
use argus::replay::ReplayCorrelator;
use argus::sourcemap::SourceMapRegistry;
use argus::spike::{SpikeDetector, SpikeMonitor};
use argus::stack::FrameResolver;
use argus::stream::{Heartbeat, StreamRegistry};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env();
    info!("argusd starting");

    info!("initializing event store");
    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());

    info!(
        window_ms = config.dedup_window.as_millis() as u64,
        "initializing dedup cache"
    );
    let dedup: Arc<dyn DedupStore> = Arc::new(DedupCache::new(config.dedup_window));

    info!("initializing source map registry");
    let sourcemaps = Arc::new(SourceMapRegistry::new(config.map_cache_capacity));

    let queue = Arc::new(MemoryTaskQueue::default());

    info!(workers = config.resolve_workers, "starting resolution workers");
    let workers = Arc::new(WorkerPool::spawn(
        config.resolve_workers,
        Arc::clone(&queue),
        Arc::clone(&store),
        FrameResolver::new(Arc::clone(&sourcemaps)),
        config.resolve_max_attempts,
        config.resolve_retry_delay,
    ));

    info!("initializing live stream registry");
    let stream = Arc::new(StreamRegistry::with_capacity(config.subscriber_capacity));
    let heartbeat = Heartbeat::spawn_every(Arc::clone(&stream), config.heartbeat_interval);

    let pipeline = Arc::new(IngestPipeline::new(
        Arc::clone(&store),
        Arc::clone(&dedup),
        Arc::clone(&queue) as Arc<dyn TaskQueue>,
        Arc::clone(&stream),
    ));

    let correlator = Arc::new(ReplayCorrelator::with_retry_delay(
        Arc::clone(&store),
        config.replay_retry_delay,
    ));

    info!(
        multiplier = config.spike_multiplier,
        min_count = config.spike_min_count,
        "starting spike monitor"
    );
    let spikes = Arc::new(
        SpikeDetector::new(Arc::clone(&store))
            .with_thresholds(config.spike_multiplier, config.spike_min_count)
            .with_window(config.spike_window),
    );
    let monitor = SpikeMonitor::spawn_every(
        Arc::clone(&spikes),
        Arc::clone(&stream),
        config.spike_interval,
    );

    let state = Arc::new(AppState {
        pipeline,
        store,
        dedup,
        queue: queue as Arc<dyn TaskQueue>,
        workers: Arc::clone(&workers),
        sourcemaps,
        correlator,
        spikes,
        stream,
        started_at_ms: now_ms(),
    });

    info!(
        addr = %config.addr,
        store = state.store.name(),
        dedup = state.dedup.name(),
        queue = state.queue.name(),
        "pipeline ready"
    );
    serve(state, &config.addr).await?;

    info!("stopping background tasks");
    monitor.shutdown();
    heartbeat.shutdown();
    workers.shutdown();

    info!("argusd stopped");
    Ok(())
}
