/*!
 * Observability
 * Tracing setup and timing spans
 */

pub mod tracer;

pub use tracer::{init_tracing, IngestSpan, ResolveSpan};
