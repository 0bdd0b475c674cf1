/*!
 * Source Map Subsystem
 * Upload storage, VLQ decoding, and generated-to-original position lookup
 */

pub mod parse;
pub mod registry;
pub mod types;

pub use parse::ParsedSourceMap;
pub use registry::{map_file_name, RegistryStats, SourceMapMeta, SourceMapRegistry};
pub use types::{OriginalPosition, RawSourceMap, SourceMapError, SourceMapResult};
