/*!
 * Source Map Types
 * Wire format, parsed representation, and lookup results
 */

use crate::core::data_structures::InlineString;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source-map-related errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SourceMapError {
    #[error("Unsupported source map version: {0}")]
    #[diagnostic(
        code(sourcemap::unsupported_version),
        help("Only source map revision 3 is supported. Check your bundler output.")
    )]
    UnsupportedVersion(u32),

    #[error("Malformed source map: {0}")]
    #[diagnostic(
        code(sourcemap::malformed),
        help("The uploaded file is not a valid source map document.")
    )]
    Malformed(InlineString),

    #[error("Invalid VLQ data at mapping offset {offset}")]
    #[diagnostic(
        code(sourcemap::invalid_vlq),
        help("The mappings string is corrupt. Re-generate the map from the build.")
    )]
    InvalidVlq { offset: usize },

    #[error("Source map too large: {size} bytes (limit {limit})")]
    #[diagnostic(
        code(sourcemap::too_large),
        help("Split the bundle or raise the upload limit.")
    )]
    TooLarge { size: usize, limit: usize },
}

/// Result type for source map operations
pub type SourceMapResult<T> = std::result::Result<T, SourceMapError>;

/// Source map revision 3 document as uploaded
///
/// `sources_content` is accepted but not retained after parsing; the
/// pipeline only needs positions, not original file bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSourceMap {
    pub version: u32,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
    #[serde(default, rename = "sourceRoot", skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default, rename = "file", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(
        default,
        rename = "sourcesContent",
        skip_serializing_if = "Option::is_none"
    )]
    pub sources_content: Option<Vec<Option<String>>>,
}

/// Original source position for a generated location (1-based, display-ready)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
