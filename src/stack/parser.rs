/*!
 * Stack Trace Parser
 * Extracts frames from raw V8-style stack trace text
 */

use super::frame::RawFrame;
use crate::core::limits::{MAX_STACK_BYTES, MAX_STACK_FRAMES};
use regex::Regex;
use std::sync::OnceLock;

/// `at function (file:line:col)` - the file group is greedy so URLs with
/// colons (`https://...`) keep their scheme; the trailing numbers bind to
/// the last two colon groups
fn named_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*at\s+(?P<function>.+?)\s+\((?P<file>.+):(?P<line>\d+):(?P<col>\d+)\)\s*$")
            .expect("named frame regex")
    })
}

/// `at file:line:col` - anonymous frames with a bare location
fn bare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*at\s+(?P<file>.+):(?P<line>\d+):(?P<col>\d+)\s*$")
            .expect("bare frame regex")
    })
}

/// Parse a raw stack trace into frames
///
/// Lines that match neither form (the leading message line, `at foo (native)`,
/// blank lines, browser-internal markers) are skipped rather than failing the
/// whole trace. Input is capped before parsing so recursive crashes with
/// thousands of frames cannot dominate ingest.
pub fn parse(stack: &str) -> Vec<RawFrame> {
    let capped = truncate_at_boundary(stack, MAX_STACK_BYTES);

    let mut frames = Vec::new();
    for line in capped.lines() {
        if frames.len() >= MAX_STACK_FRAMES {
            break;
        }
        if let Some(frame) = parse_line(line) {
            frames.push(frame);
        }
    }
    frames
}

/// Parse a single stack line, if it is a frame
pub fn parse_line(line: &str) -> Option<RawFrame> {
    if let Some(caps) = named_re().captures(line) {
        let function = clean_function(&caps["function"]);
        return Some(RawFrame {
            function,
            file: Some(caps["file"].to_string()),
            line: caps["line"].parse().ok(),
            column: caps["col"].parse().ok(),
        });
    }

    if let Some(caps) = bare_re().captures(line) {
        return Some(RawFrame {
            function: None,
            file: Some(caps["file"].to_string()),
            line: caps["line"].parse().ok(),
            column: caps["col"].parse().ok(),
        });
    }

    None
}

/// Strip V8 call-site qualifiers that are not part of the function name
fn clean_function(function: &str) -> Option<String> {
    let name = function.trim().trim_start_matches("async ").trim();
    if name.is_empty() || name == "<anonymous>" {
        None
    } else {
        Some(name.to_string())
    }
}

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
