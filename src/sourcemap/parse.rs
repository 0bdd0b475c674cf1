/*!
 * Source Map Parsing
 * Base64-VLQ mappings decoder and generated-to-original position lookup
 */

use super::types::{OriginalPosition, RawSourceMap, SourceMapError, SourceMapResult};

/// Original-side reference carried by a 4- or 5-field segment
#[derive(Debug, Clone, PartialEq, Eq)]
struct OriginRef {
    source: u32,
    line: u32,
    column: u32,
    name: Option<u32>,
}

/// One decoded mapping segment on a generated line
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    gen_col: u32,
    /// None for 1-field segments, which mark generated code with no
    /// original-source counterpart
    origin: Option<OriginRef>,
}

/// Fully decoded source map, ready for position lookups
///
/// Parsing happens once per (app, release, file) and the result is cached;
/// lookups are a line index plus a binary search.
#[derive(Debug, Clone)]
pub struct ParsedSourceMap {
    sources: Vec<String>,
    names: Vec<String>,
    /// Segments per generated line, ascending by generated column
    lines: Vec<Vec<Segment>>,
}

impl ParsedSourceMap {
    /// Decode a raw source map document
    pub fn from_raw(raw: RawSourceMap) -> SourceMapResult<Self> {
        if raw.version != 3 {
            return Err(SourceMapError::UnsupportedVersion(raw.version));
        }

        let sources = join_sources(raw.source_root.as_deref(), &raw.sources);
        let mappings = raw.mappings;
        let base = mappings.as_ptr() as usize;

        let mut lines = Vec::new();
        // Source-side fields carry across lines; generated column resets per line
        let (mut src, mut src_line, mut src_col, mut name_idx) = (0i64, 0i64, 0i64, 0i64);

        for line_text in mappings.split(';') {
            let mut segments: Vec<Segment> = Vec::new();
            let mut gen_col = 0i64;

            for seg_text in line_text.split(',') {
                if seg_text.is_empty() {
                    continue;
                }
                let offset = seg_text.as_ptr() as usize - base;
                let fields = decode_vlq_fields(seg_text, offset)?;

                if !matches!(fields.len(), 1 | 4 | 5) {
                    return Err(SourceMapError::Malformed(
                        format!("segment with {} fields", fields.len()).into(),
                    ));
                }

                gen_col += fields[0];
                if gen_col < 0 {
                    return Err(SourceMapError::Malformed("negative generated column".into()));
                }

                let origin = if fields.len() >= 4 {
                    src += fields[1];
                    src_line += fields[2];
                    src_col += fields[3];
                    let name = if fields.len() == 5 {
                        name_idx += fields[4];
                        if name_idx < 0 {
                            return Err(SourceMapError::Malformed("negative name index".into()));
                        }
                        Some(name_idx as u32)
                    } else {
                        None
                    };
                    if src < 0 || src_line < 0 || src_col < 0 {
                        return Err(SourceMapError::Malformed(
                            "negative source position".into(),
                        ));
                    }
                    Some(OriginRef {
                        source: src as u32,
                        line: src_line as u32,
                        column: src_col as u32,
                        name,
                    })
                } else {
                    None
                };

                segments.push(Segment {
                    gen_col: gen_col as u32,
                    origin,
                });
            }

            // Compilers emit ascending columns, but lookup correctness
            // depends on it, so do not trust the input
            segments.sort_unstable_by_key(|s| s.gen_col);
            lines.push(segments);
        }

        Ok(Self {
            sources,
            names: raw.names,
            lines,
        })
    }

    /// Translate a generated position to its original source position
    ///
    /// Input is 0-based map coordinates; the nearest segment at or before
    /// the column wins. Output is 1-based for display. Returns None when
    /// the line is unmapped, the column precedes the first segment, or the
    /// covering segment has no original-side reference.
    pub fn lookup(&self, gen_line: u32, gen_col: u32) -> Option<OriginalPosition> {
        let segments = self.lines.get(gen_line as usize)?;
        let idx = match segments.binary_search_by_key(&gen_col, |s| s.gen_col) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };

        let origin = segments[idx].origin.as_ref()?;
        let source = self.sources.get(origin.source as usize)?.clone();
        let name = origin
            .name
            .and_then(|n| self.names.get(n as usize).cloned());

        Some(OriginalPosition {
            source,
            line: origin.line + 1,
            column: origin.column + 1,
            name,
        })
    }

    /// Total decoded segments (size signal for cache logging)
    pub fn segment_count(&self) -> usize {
        self.lines.iter().map(|l| l.len()).sum()
    }
}

/// Decode all VLQ values in one comma-free segment
fn decode_vlq_fields(seg: &str, base_offset: usize) -> SourceMapResult<Vec<i64>> {
    let mut fields = Vec::with_capacity(5);
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    let mut in_value = false;

    for (i, byte) in seg.bytes().enumerate() {
        let digit = b64_value(byte).ok_or(SourceMapError::InvalidVlq {
            offset: base_offset + i,
        })?;
        // 7 digits covers every position a real bundle can contain
        if shift >= 35 {
            return Err(SourceMapError::InvalidVlq {
                offset: base_offset + i,
            });
        }
        in_value = true;
        result |= (digit & 0x1f) << shift;
        shift += 5;

        if digit & 0x20 == 0 {
            let negative = result & 1 == 1;
            let mut value = result >> 1;
            if negative {
                value = -value;
            }
            fields.push(value);
            result = 0;
            shift = 0;
            in_value = false;
        }
    }

    if in_value {
        // Dangling continuation bit
        return Err(SourceMapError::InvalidVlq {
            offset: base_offset + seg.len().saturating_sub(1),
        });
    }
    Ok(fields)
}

/// Base64 digit value (standard alphabet)
const fn b64_value(byte: u8) -> Option<i64> {
    match byte {
        b'A'..=b'Z' => Some((byte - b'A') as i64),
        b'a'..=b'z' => Some((byte - b'a') as i64 + 26),
        b'0'..=b'9' => Some((byte - b'0') as i64 + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Prefix sources with the map's sourceRoot, leaving absolute refs alone
fn join_sources(root: Option<&str>, sources: &[String]) -> Vec<String> {
    match root {
        Some(root) if !root.is_empty() => sources
            .iter()
            .map(|s| {
                if s.contains("://") || s.starts_with('/') {
                    s.clone()
                } else {
                    format!(
                        "{}/{}",
                        root.trim_end_matches('/'),
                        s.trim_start_matches("./")
                    )
                }
            })
            .collect(),
        _ => sources.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(mappings: &str) -> RawSourceMap {
        RawSourceMap {
            version: 3,
            sources: vec!["a.ts".to_string(), "b.ts".to_string()],
            names: vec!["boot".to_string()],
            mappings: mappings.to_string(),
            source_root: None,
            file: None,
            sources_content: None,
        }
    }

    #[test]
    fn test_vlq_decoding() {
        // A=0, C=1, D=-1, E=2, I=4
        assert_eq!(decode_vlq_fields("AAAA", 0).unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(decode_vlq_fields("IACA", 0).unwrap(), vec![4, 0, 1, 0]);
        assert_eq!(decode_vlq_fields("D", 0).unwrap(), vec![-1]);
        // gB = 16 (continuation into second digit)
        assert_eq!(decode_vlq_fields("gB", 0).unwrap(), vec![16]);
    }

    #[test]
    fn test_vlq_rejects_garbage() {
        let err = decode_vlq_fields("AAA!", 10).unwrap_err();
        assert_eq!(err, SourceMapError::InvalidVlq { offset: 13 });

        // Dangling continuation bit
        assert!(matches!(
            decode_vlq_fields("g", 0).unwrap_err(),
            SourceMapError::InvalidVlq { .. }
        ));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let mut map = raw("AAAA");
        map.version = 2;
        assert_eq!(
            ParsedSourceMap::from_raw(map).unwrap_err(),
            SourceMapError::UnsupportedVersion(2)
        );
    }

    #[test]
    fn test_lookup_exact_and_nearest_before() {
        // Line 0: col 0 -> a.ts:0:0, col 4 -> a.ts:1:0
        // Line 1: unmapped
        // Line 2: col 0 -> b.ts:0:0
        let parsed = ParsedSourceMap::from_raw(raw("AAAA,IACA;;ACDA")).unwrap();

        let hit = parsed.lookup(0, 0).unwrap();
        assert_eq!(hit.source, "a.ts");
        assert_eq!((hit.line, hit.column), (1, 1));

        let hit = parsed.lookup(0, 4).unwrap();
        assert_eq!((hit.line, hit.column), (2, 1));

        // Columns between segments resolve to the nearest one before
        let hit = parsed.lookup(0, 3).unwrap();
        assert_eq!(hit.line, 1);
        let hit = parsed.lookup(0, 100).unwrap();
        assert_eq!(hit.line, 2);

        let hit = parsed.lookup(2, 5).unwrap();
        assert_eq!(hit.source, "b.ts");
        assert_eq!(hit.line, 1);
    }

    #[test]
    fn test_lookup_misses() {
        let parsed = ParsedSourceMap::from_raw(raw("AAAA,IACA;;ACDA")).unwrap();

        // Unmapped generated line
        assert!(parsed.lookup(1, 0).is_none());
        // Line beyond the map
        assert!(parsed.lookup(9, 0).is_none());
    }

    #[test]
    fn test_column_before_first_segment() {
        // First segment starts at column 4 (I=4)
        let parsed = ParsedSourceMap::from_raw(raw("IAAA")).unwrap();
        assert!(parsed.lookup(0, 0).is_none());
        assert!(parsed.lookup(0, 4).is_some());
    }

    #[test]
    fn test_one_field_segment_has_no_origin() {
        // E = generated column 2, no original-side fields
        let parsed = ParsedSourceMap::from_raw(raw("E")).unwrap();
        assert!(parsed.lookup(0, 2).is_none());
        assert!(parsed.lookup(0, 10).is_none());
    }

    #[test]
    fn test_name_resolution() {
        // AAAAA: 5 fields, name index 0 -> "boot"
        let parsed = ParsedSourceMap::from_raw(raw("AAAAA")).unwrap();
        let hit = parsed.lookup(0, 0).unwrap();
        assert_eq!(hit.name.as_deref(), Some("boot"));
    }

    #[test]
    fn test_source_root_joining() {
        let mut map = raw("AAAA");
        map.source_root = Some("webpack://shop/".to_string());
        map.sources = vec![
            "./src/cart.ts".to_string(),
            "/abs/path.ts".to_string(),
            "https://cdn.example.com/x.ts".to_string(),
        ];
        let parsed = ParsedSourceMap::from_raw(map).unwrap();
        let hit = parsed.lookup(0, 0).unwrap();
        assert_eq!(hit.source, "webpack://shop/src/cart.ts");
        assert_eq!(parsed.sources[1], "/abs/path.ts");
        assert_eq!(parsed.sources[2], "https://cdn.example.com/x.ts");
    }

    #[test]
    fn test_segment_counts() {
        let parsed = ParsedSourceMap::from_raw(raw("AAAA,IACA;;ACDA")).unwrap();
        assert_eq!(parsed.segment_count(), 3);
    }

    #[test]
    fn test_malformed_field_count() {
        // Two VLQ values is not a legal segment arity
        let err = ParsedSourceMap::from_raw(raw("AA")).unwrap_err();
        assert!(matches!(err, SourceMapError::Malformed(_)));
    }
}
