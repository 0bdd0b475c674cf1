/*!
 * Source Map Registry
 * Uploaded artifact storage with a bounded parsed-map cache
 */

use ahash::RandomState;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::parse::ParsedSourceMap;
use super::types::{OriginalPosition, RawSourceMap, SourceMapError, SourceMapResult};
use crate::core::json;
use crate::core::limits::{MAX_SOURCEMAP_BYTES, PARSED_MAP_CACHE_CAPACITY};
use crate::core::types::{AppId, Release};
use serde::{Deserialize, Serialize};

/// Artifact key: one map per (app, release, map file name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ArtifactKey {
    app_id: AppId,
    release: Release,
    file: String,
}

impl ArtifactKey {
    fn new(app_id: AppId, release: &str, file: &str) -> Self {
        Self {
            app_id,
            release: release.to_string(),
            file: file_key(file),
        }
    }
}

/// A stored upload: raw map body plus the optional path-rewrite prefix
#[derive(Debug, Clone)]
struct StoredArtifact {
    body: Bytes,
    url_prefix: Option<String>,
}

/// Metadata for uploaded artifacts (listing endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMapMeta {
    pub release: Release,
    pub file: String,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_prefix: Option<String>,
}

/// Registry statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStats {
    pub maps: usize,
    pub parsed_cached: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Source map registry with parse-once caching
///
/// Raw uploads are kept verbatim; decoded maps live in a bounded cache
/// because parsing a multi-MB map dominates resolution cost while a burst
/// of errors from one release hits the same few maps.
pub struct SourceMapRegistry {
    artifacts: DashMap<ArtifactKey, StoredArtifact, RandomState>,
    parsed: DashMap<ArtifactKey, Arc<ParsedSourceMap>, RandomState>,
    max_parsed: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SourceMapRegistry {
    /// Create new registry with the given parsed-map cache capacity
    pub fn new(max_parsed: usize) -> Self {
        Self {
            artifacts: DashMap::with_hasher(RandomState::new()),
            parsed: DashMap::with_capacity_and_hasher(max_parsed, RandomState::new()),
            max_parsed,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Store an uploaded source map artifact
    ///
    /// `file` is the map file name (`app.abc123.js.map`). The document is
    /// fully decoded up front so corrupt uploads fail at upload time, not
    /// during resolution. Re-uploading replaces the artifact.
    pub fn store(
        &self,
        app_id: AppId,
        release: &str,
        file: &str,
        url_prefix: Option<String>,
        body: Bytes,
    ) -> SourceMapResult<()> {
        if body.len() > MAX_SOURCEMAP_BYTES {
            return Err(SourceMapError::TooLarge {
                size: body.len(),
                limit: MAX_SOURCEMAP_BYTES,
            });
        }

        let raw_map: RawSourceMap = json::deserialize_sourcemap(&body)
            .map_err(|e| SourceMapError::Malformed(e.to_string().into()))?;
        let parsed = ParsedSourceMap::from_raw(raw_map)?;

        let key = ArtifactKey::new(app_id, release, file);
        tracing::info!(
            app_id,
            release,
            file = %key.file,
            size = body.len(),
            segments = parsed.segment_count(),
            "source map stored"
        );

        self.artifacts
            .insert(key.clone(), StoredArtifact { body, url_prefix });
        self.insert_parsed(key, Arc::new(parsed));
        Ok(())
    }

    /// Translate a browser frame position through the registered map
    ///
    /// `map_file` is the artifact name derived from the frame's file path
    /// (see [`map_file_name`]). `line` and `column` are 1-based as browsers
    /// report them; the result is 1-based as well. Returns None when no
    /// artifact is registered, the position is unmapped, or the map cannot
    /// be decoded.
    pub fn lookup(
        &self,
        app_id: AppId,
        release: &str,
        map_file: &str,
        line: u32,
        column: u32,
    ) -> Option<OriginalPosition> {
        if line == 0 || column == 0 {
            return None;
        }
        let key = ArtifactKey::new(app_id, release, map_file);
        let parsed = self.parsed_for(&key)?;
        parsed.lookup(line - 1, column - 1)
    }

    /// Uploaded artifacts for an app
    pub fn list(&self, app_id: AppId) -> Vec<SourceMapMeta> {
        let mut maps: Vec<SourceMapMeta> = self
            .artifacts
            .iter()
            .filter(|entry| entry.key().app_id == app_id)
            .map(|entry| SourceMapMeta {
                release: entry.key().release.clone(),
                file: entry.key().file.clone(),
                size: entry.value().body.len(),
                url_prefix: entry.value().url_prefix.clone(),
            })
            .collect();
        maps.sort_by(|a, b| (&a.release, &a.file).cmp(&(&b.release, &b.file)));
        maps
    }

    /// Registry statistics
    pub fn stats(&self) -> RegistryStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        RegistryStats {
            maps: self.artifacts.len(),
            parsed_cached: self.parsed.len(),
            hits,
            misses,
            hit_rate,
        }
    }

    /// Fetch the decoded map, re-parsing from the raw upload on cache miss
    fn parsed_for(&self, key: &ArtifactKey) -> Option<Arc<ParsedSourceMap>> {
        if let Some(entry) = self.parsed.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(Arc::clone(entry.value()));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        // Clone the Bytes handle out so the shard lock is not held while
        // decoding a multi-MB map
        let body = self
            .artifacts
            .get(key)
            .map(|entry| entry.value().body.clone())?;

        let raw_map: RawSourceMap = match json::deserialize_sourcemap(&body) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(app_id = key.app_id, file = %key.file, error = %e, "stored source map no longer decodes");
                return None;
            }
        };
        let parsed = match ParsedSourceMap::from_raw(raw_map) {
            Ok(parsed) => Arc::new(parsed),
            Err(e) => {
                tracing::warn!(app_id = key.app_id, file = %key.file, error = %e, "stored source map no longer decodes");
                return None;
            }
        };

        self.insert_parsed(key.clone(), Arc::clone(&parsed));
        Some(parsed)
    }

    /// Insert into the parsed cache, evicting an arbitrary entry when full
    fn insert_parsed(&self, key: ArtifactKey, parsed: Arc<ParsedSourceMap>) {
        if self.parsed.len() >= self.max_parsed && !self.parsed.contains_key(&key) {
            // Bound outside the `if let` so the iterator's shard guard is
            // released before `remove` takes the write lock; scrutinee
            // temporaries live for the whole `if let` body
            let first = self.parsed.iter().next();
            if let Some(entry) = first {
                let evict = entry.key().clone();
                drop(entry);
                self.parsed.remove(&evict);
            }
        }
        self.parsed.insert(key, parsed);
    }
}

impl Default for SourceMapRegistry {
    fn default() -> Self {
        Self::new(PARSED_MAP_CACHE_CAPACITY)
    }
}

/// Derive the artifact name for a frame's file path
///
/// Frames carry full URLs (`https://cdn.example.com/assets/app.abc123.js?v=2`)
/// while artifacts are named after the map file; both land on
/// `app.abc123.js.map`.
pub fn map_file_name(frame_file: &str) -> String {
    let mut name = file_key(frame_file);
    name.push_str(".map");
    name
}

/// Normalize a file reference to its basename, dropping query and fragment
fn file_key(file: &str) -> String {
    file.split(['?', '#'])
        .next()
        .unwrap_or(file)
        .rsplit('/')
        .next()
        .unwrap_or(file)
        .to_string()
}
