/*!
 * JSON Helpers
 * Size-switched parsing with SIMD acceleration for large payloads
 */

use serde::{de::DeserializeOwned, Serialize};

/// Bodies above this size parse through simd-json (1KB)
use crate::core::limits::JSON_SIMD_THRESHOLD as SIMD_THRESHOLD;

/// Result type for JSON operations
pub type JsonResult<T> = Result<T, JsonError>;

/// JSON operation errors
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

// ============================================================================
// Core Functions
// ============================================================================

/// Serialize to a JSON string
///
/// Always serde_json: simd-json pays off on the parse side only, and the
/// frames and responses this crate emits are serialize-bound either way.
#[inline]
pub fn to_string<T: Serialize>(value: &T) -> JsonResult<String> {
    serde_json::to_string(value).map_err(|e| JsonError::Serialization(e.to_string()))
}

/// Deserialize JSON bytes, picking the parser by body size
///
/// Single events sit well under the threshold and take serde_json; batch
/// and replay bodies go through simd-json. This is the entry point for
/// every ingest payload.
#[inline]
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> JsonResult<T> {
    if bytes.len() > SIMD_THRESHOLD {
        from_slice_simd(bytes)
    } else {
        serde_json::from_slice(bytes).map_err(|e| JsonError::Deserialization(e.to_string()))
    }
}

/// Deserialize JSON bytes through simd-json unconditionally
///
/// simd-json parses in place, so the input is copied into a scratch
/// buffer first; the copy is cheap next to the parse at these sizes.
#[inline]
pub fn from_slice_simd<T: DeserializeOwned>(bytes: &[u8]) -> JsonResult<T> {
    let mut scratch = bytes.to_vec();
    simd_json::from_slice(&mut scratch).map_err(|e| JsonError::Deserialization(e.to_string()))
}

// ============================================================================
// Domain Conveniences
// ============================================================================

/// Serialize a live stream frame to text
///
/// Fan-out must not propagate errors, so a failed serialization logs and
/// yields an empty frame the registry will skip delivering.
#[inline]
pub fn serialize_stream_message<T: Serialize>(value: &T) -> String {
    to_string(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize stream message");
        String::new()
    })
}

/// Deserialize a source map document (always SIMD)
///
/// Production source maps run from hundreds of KB to tens of MB, so the
/// SIMD path is always worth it.
#[inline]
pub fn deserialize_sourcemap<T: DeserializeOwned>(bytes: &[u8]) -> JsonResult<T> {
    from_slice_simd(bytes)
}
