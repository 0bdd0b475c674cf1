/*!
 * Stack Frame Types
 * Raw browser frames and their source-mapped counterparts
 */

use serde::{Deserialize, Serialize};

/// One frame as parsed from a raw browser stack trace
///
/// Line and column are 1-based, as browsers report them. Any field can be
/// absent; a frame with no location still contributes its function name
/// to the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

/// One frame after source map resolution
///
/// When `mapped` is true the fields point into original sources; when the
/// lookup failed for this frame the raw minified values are carried over
/// unchanged so the trace stays contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// True when the frame was translated through a source map
    pub mapped: bool,
}

impl ResolvedFrame {
    /// Carry a raw frame through unchanged (per-frame fallback)
    pub fn fallback(raw: &RawFrame) -> Self {
        Self {
            function: raw.function.clone(),
            file: raw.file.clone(),
            line: raw.line,
            column: raw.column,
            mapped: false,
        }
    }

    /// Render this frame as one stack-trace line
    pub fn render_line(&self) -> String {
        let location = match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(column)) => format!("{file}:{line}:{column}"),
            (Some(file), Some(line), None) => format!("{file}:{line}"),
            (Some(file), _, _) => file.clone(),
            _ => "<unknown>".to_string(),
        };
        match &self.function {
            Some(function) => format!("    at {function} ({location})"),
            None => format!("    at {location}"),
        }
    }
}

/// Reassemble resolved frames into stack text, one line per frame
pub fn render_stack(frames: &[ResolvedFrame]) -> String {
    let mut out = String::new();
    for (i, frame) in frames.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&frame.render_line());
    }
    out
}
