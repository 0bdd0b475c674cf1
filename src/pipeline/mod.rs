/*!
 * Pipeline
 * The synchronous ingest path tying the components together
 */

pub mod ingest;

pub use ingest::{IngestOutcome, IngestPipeline, PipelineStats};
