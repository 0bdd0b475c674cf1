/*!
 * Fingerprint Engine
 * Stable error-class identity from type, message, and stack shape
 */

use crate::core::limits::{FINGERPRINT_FRAME_COUNT, MAX_MESSAGE_LEN};
use crate::core::types::Fingerprint;
use crate::stack::RawFrame;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .expect("uuid regex")
    })
}

fn hex_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"0x[0-9a-fA-F]+|\b[0-9a-fA-F]{16,}\b").expect("hex regex"))
}

fn num_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("number regex"))
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn chunk_hash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.[0-9a-fA-F]{6,32}\.").expect("chunk hash regex"))
}

/// Normalize an error message so volatile fragments do not split one
/// error class into many fingerprints
///
/// Replaces UUIDs, hex ids, and numbers with placeholders, collapses
/// whitespace, and truncates pathological messages. `User 12345 not found`
/// and `User 99 not found` normalize identically.
pub fn normalize_message(message: &str) -> String {
    let truncated = truncate_at_boundary(message, MAX_MESSAGE_LEN);
    // Order matters: UUIDs before hex before bare numbers, or the earlier
    // classes get shredded into number placeholders
    let msg = uuid_re().replace_all(truncated, "<id>");
    let msg = hex_re().replace_all(&msg, "<hex>");
    let msg = num_re().replace_all(&msg, "<n>");
    let msg = ws_re().replace_all(&msg, " ");
    msg.trim().to_string()
}

/// Normalize a frame's file reference for fingerprinting
///
/// Keeps the basename only and strips build-hash segments, so the same
/// code fingerprints identically across deploys (`app.a1b2c3d4.js` and
/// `app.9f8e7d6c.js` both become `app.js`).
fn normalize_file(file: &str) -> String {
    let trimmed = file
        .split(['?', '#'])
        .next()
        .unwrap_or(file)
        .rsplit('/')
        .next()
        .unwrap_or(file);
    chunk_hash_re().replace_all(trimmed, ".").into_owned()
}

/// One frame's contribution to the fingerprint: `function@file`
///
/// Line and column are deliberately excluded; they churn with every
/// minified build while function and file identify the code.
fn frame_signature(frame: &RawFrame) -> String {
    let function = frame.function.as_deref().unwrap_or("<anonymous>");
    let file = frame
        .file
        .as_deref()
        .map(normalize_file)
        .unwrap_or_else(|| "<unknown>".to_string());
    format!("{}@{}", function, file)
}

/// Compute the stable fingerprint for an error
///
/// SHA-256 over the error type, the normalized message, and the top
/// frames' signatures. Identical errors across a burst, and across
/// hashed-filename deploys, collapse onto one fingerprint.
pub fn compute(error_type: &str, message: &str, frames: &[RawFrame]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(error_type.as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_message(message).as_bytes());
    hasher.update(b"|");
    for frame in frames.iter().take(FINGERPRINT_FRAME_COUNT) {
        hasher.update(frame_signature(frame).as_bytes());
        hasher.update(b"\n");
    }

    let digest = hasher.finalize();
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

/// Truncate on a char boundary at or below `max` bytes
fn truncate_at_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(function: Option<&str>, file: &str) -> RawFrame {
        RawFrame {
            function: function.map(|f| f.to_string()),
            file: Some(file.to_string()),
            line: Some(1),
            column: Some(1),
        }
    }

    #[test]
    fn test_normalize_strips_numbers() {
        assert_eq!(
            normalize_message("User 12345 not found"),
            normalize_message("User 99 not found")
        );
        assert_eq!(normalize_message("User 12345 not found"), "User <n> not found");
    }

    #[test]
    fn test_normalize_strips_uuids_and_hex() {
        let a = normalize_message("session 550e8400-e29b-41d4-a716-446655440000 expired");
        let b = normalize_message("session 123e4567-e89b-12d3-a456-426614174000 expired");
        assert_eq!(a, b);
        assert_eq!(a, "session <id> expired");

        assert_eq!(
            normalize_message("bad pointer 0xdeadbeef"),
            "bad pointer <hex>"
        );
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_message("  a \n\t b  "), "a b");
    }

    #[test]
    fn test_same_error_same_fingerprint() {
        let frames = vec![frame(Some("submit"), "app.js"), frame(None, "vendor.js")];
        let a = compute("TypeError", "x is not a function", &frames);
        let b = compute("TypeError", "x is not a function", &frames);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_type_distinguishes() {
        let frames = vec![frame(Some("submit"), "app.js")];
        let a = compute("TypeError", "boom", &frames);
        let b = compute("RangeError", "boom", &frames);
        assert_ne!(a, b);
    }

    #[test]
    fn test_volatile_message_parts_ignored() {
        let frames = vec![frame(Some("load"), "app.js")];
        let a = compute("Error", "timeout after 1500ms for order 42", &frames);
        let b = compute("Error", "timeout after 9000ms for order 7", &frames);
        assert_eq!(a, b);
    }

    #[test]
    fn test_only_top_frames_contribute() {
        let mut deep_a: Vec<RawFrame> = (0..8)
            .map(|i| frame(Some(&format!("f{i}")), "app.js"))
            .collect();
        let mut deep_b = deep_a.clone();
        // Diverge beyond the contributing depth
        deep_a.push(frame(Some("tail_a"), "a.js"));
        deep_b.push(frame(Some("tail_b"), "b.js"));

        let a = compute("Error", "boom", &deep_a);
        let b = compute("Error", "boom", &deep_b);
        assert_eq!(a, b);

        // Divergence inside the top frames must split fingerprints
        deep_b[0].function = Some("other".to_string());
        let c = compute("Error", "boom", &deep_b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_build_hash_filenames_stable() {
        let a = compute(
            "TypeError",
            "boom",
            &[frame(Some("submit"), "https://cdn.example.com/assets/app.a1b2c3d4.js")],
        );
        let b = compute(
            "TypeError",
            "boom",
            &[frame(Some("submit"), "https://other.example.com/static/app.9f8e7d6c.js")],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_line_and_column_do_not_contribute() {
        let mut f1 = frame(Some("submit"), "app.js");
        f1.line = Some(1);
        f1.column = Some(100);
        let mut f2 = frame(Some("submit"), "app.js");
        f2.line = Some(9999);
        f2.column = Some(1);

        assert_eq!(
            compute("Error", "boom", &[f1]),
            compute("Error", "boom", &[f2])
        );
    }

    #[test]
    fn test_no_frames_still_fingerprints() {
        let fp = compute("Error", "boom", &[]);
        assert_eq!(fp.len(), 64);
    }

    #[test]
    fn test_truncate_at_boundary_respects_utf8() {
        let s = "é".repeat(10_000);
        let out = truncate_at_boundary(&s, MAX_MESSAGE_LEN);
        assert!(out.len() <= MAX_MESSAGE_LEN);
        assert!(out.chars().all(|c| c == 'é'));
    }

    // Property-based tests for identity stability
    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Hashing is a pure function of its inputs
            #[test]
            fn compute_is_deterministic(
                error_type in "[A-Za-z]{1,24}",
                message in ".*",
                function in proptest::option::of("[A-Za-z0-9_.<> ]{1,32}"),
                file in proptest::option::of("[A-Za-z0-9_./-]{1,48}"),
            ) {
                let frames = vec![RawFrame {
                    function,
                    file,
                    line: Some(1),
                    column: Some(1),
                }];
                let a = compute(&error_type, &message, &frames);
                let b = compute(&error_type, &message, &frames);
                prop_assert_eq!(&a, &b);
                prop_assert_eq!(a.len(), 64);
                prop_assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
            }

            /// Positions shift on every minified build; identity must not follow
            #[test]
            fn positions_never_contribute(
                line_a in proptest::option::of(any::<u32>()),
                col_a in proptest::option::of(any::<u32>()),
                line_b in proptest::option::of(any::<u32>()),
                col_b in proptest::option::of(any::<u32>()),
            ) {
                let mut one = frame(Some("submit"), "app.js");
                one.line = line_a;
                one.column = col_a;
                let mut two = frame(Some("submit"), "app.js");
                two.line = line_b;
                two.column = col_b;

                prop_assert_eq!(
                    compute("Error", "boom", &[one]),
                    compute("Error", "boom", &[two])
                );
            }

            /// Arbitrary garbage never panics the normalizer
            #[test]
            fn normalize_handles_any_input(message in ".*") {
                let out = normalize_message(&message);
                // Placeholders can grow isolated digits, but never past 3x
                prop_assert!(out.len() <= MAX_MESSAGE_LEN * 3);
                prop_assert_eq!(out.trim(), out.as_str());
            }
        }
    }
}
