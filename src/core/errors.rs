/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::data_structures::InlineString;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export StoreError from event module
pub use crate::event::store::StoreError;

// Re-export QueueError from queue module
pub use crate::queue::traits::QueueError;

// Re-export SourceMapError from sourcemap module
pub use crate::sourcemap::types::SourceMapError;

/// Ingest validation errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum IngestError {
    #[error("Missing required field: {0}")]
    #[diagnostic(
        code(ingest::missing_field),
        help("The SDK payload omitted a required field. Check SDK version compatibility.")
    )]
    MissingField(InlineString),

    #[error("Unknown event kind: {0}")]
    #[diagnostic(
        code(ingest::unknown_kind),
        help("Supported kinds: error, performance, web-vital, session, session-replay, message, custom.")
    )]
    UnknownKind(InlineString),

    #[error("Payload too large: {size} bytes (limit {limit})")]
    #[diagnostic(
        code(ingest::payload_too_large),
        help("Trim breadcrumbs and context on the client before sending.")
    )]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Batch too large: {count} events (limit {limit})")]
    #[diagnostic(
        code(ingest::batch_too_large),
        help("Split the batch into smaller envelopes.")
    )]
    BatchTooLarge { count: usize, limit: usize },

    #[error("Malformed payload: {0}")]
    #[diagnostic(
        code(ingest::malformed),
        help("The payload did not match the expected envelope shape.")
    )]
    Malformed(InlineString),
}

/// Unified pipeline error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum ArgusError {
    #[error("Ingest error: {0}")]
    #[diagnostic(transparent)]
    Ingest(#[from] IngestError),

    #[error("Store error: {0}")]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("Source map error: {0}")]
    #[diagnostic(transparent)]
    SourceMap(#[from] SourceMapError),

    #[error("Queue error: {0}")]
    #[diagnostic(transparent)]
    Queue(#[from] QueueError),

    #[error("I/O error: {0}")]
    #[diagnostic(
        code(argus::io_error),
        help("Network or I/O operation failed. Check connectivity and disk space.")
    )]
    Io(InlineString),
}

// JSON parse failures surface as IngestError::Malformed or
// SourceMapError::Malformed; only the listener path produces raw I/O errors.
impl From<std::io::Error> for ArgusError {
    fn from(err: std::io::Error) -> Self {
        ArgusError::Io(err.to_string().into())
    }
}

/// Serializable error representation for API responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SerializableError {
    pub error_type: InlineString,
    pub message: InlineString,
}

impl SerializableError {
    /// Create a new serializable error
    pub fn new(error_type: impl Into<InlineString>, message: impl Into<InlineString>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

impl From<IngestError> for SerializableError {
    fn from(err: IngestError) -> Self {
        SerializableError::new("ingest_error", err.to_string())
    }
}

impl From<ArgusError> for SerializableError {
    fn from(err: ArgusError) -> Self {
        let error_type = match &err {
            ArgusError::Ingest(_) => "ingest_error",
            ArgusError::Store(_) => "store_error",
            ArgusError::SourceMap(_) => "source_map_error",
            ArgusError::Queue(_) => "queue_error",
            ArgusError::Io(_) => "io_error",
        };
        SerializableError::new(error_type, err.to_string())
    }
}

/// Result type for pipeline operations
///
/// # Must Use
/// Pipeline operations can fail and must be handled to avoid silently dropping events
pub type Result<T> = std::result::Result<T, ArgusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_serialization() {
        let error = IngestError::MissingField("message".into());
        let json = serde_json::to_string(&error).unwrap();
        let deserialized: IngestError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn test_payload_too_large_display() {
        let error = IngestError::PayloadTooLarge {
            size: 2048,
            limit: 1024,
        };
        assert_eq!(
            error.to_string(),
            "Payload too large: 2048 bytes (limit 1024)"
        );
    }

    #[test]
    fn test_serializable_error_creation() {
        let error = SerializableError::new("test_error", "test message");
        assert_eq!(error.error_type, "test_error");
        assert_eq!(error.message, "test message");
    }

    #[test]
    fn test_serializable_error_from_ingest_error() {
        let ingest_error = IngestError::UnknownKind("telemetry".into());
        let serializable: SerializableError = ingest_error.into();
        assert_eq!(serializable.error_type, "ingest_error");
    }

    #[test]
    fn test_argus_error_display() {
        let error = ArgusError::Io("connection reset".into());
        assert_eq!(error.to_string(), "I/O error: connection reset");
    }
}
