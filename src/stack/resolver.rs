/*!
 * Frame Resolver
 * Translates parsed browser frames to original source positions
 */

use std::sync::Arc;

use super::frame::{render_stack, RawFrame, ResolvedFrame};
use crate::core::types::AppId;
use crate::sourcemap::{map_file_name, SourceMapRegistry};

/// Result of resolving one stack
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub frames: Vec<ResolvedFrame>,
    pub mapped: usize,
    pub fallback: usize,
}

impl ResolveOutcome {
    /// Reassembled stack text, one resolved-or-original line per frame
    pub fn to_stack_text(&self) -> String {
        render_stack(&self.frames)
    }
}

/// Resolver applying registered source maps frame by frame
///
/// Resolution never fails a whole stack: frames without a usable map
/// keep their minified position so a partially-mapped stack still reads.
#[derive(Clone)]
pub struct FrameResolver {
    registry: Arc<SourceMapRegistry>,
}

impl FrameResolver {
    pub fn new(registry: Arc<SourceMapRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve every frame, falling back per frame
    pub fn resolve(
        &self,
        app_id: AppId,
        release: Option<&str>,
        frames: &[RawFrame],
    ) -> ResolveOutcome {
        let mut resolved = Vec::with_capacity(frames.len());
        let mut mapped = 0;

        for frame in frames {
            let out = self.resolve_frame(app_id, release, frame);
            if out.mapped {
                mapped += 1;
            }
            resolved.push(out);
        }

        let fallback = resolved.len() - mapped;
        ResolveOutcome {
            frames: resolved,
            mapped,
            fallback,
        }
    }

    fn resolve_frame(
        &self,
        app_id: AppId,
        release: Option<&str>,
        frame: &RawFrame,
    ) -> ResolvedFrame {
        // Without a release there is no artifact to consult
        let Some(release) = release else {
            return ResolvedFrame::fallback(frame);
        };
        let (Some(file), Some(line), Some(column)) = (&frame.file, frame.line, frame.column) else {
            return ResolvedFrame::fallback(frame);
        };

        let map_file = map_file_name(file);
        match self.registry.lookup(app_id, release, &map_file, line, column) {
            Some(pos) => ResolvedFrame {
                // Prefer the original symbol recorded in the map
                function: pos.name.or_else(|| frame.function.clone()),
                file: Some(pos.source),
                line: Some(pos.line),
                column: Some(pos.column),
                mapped: true,
            },
            None => ResolvedFrame::fallback(frame),
        }
    }
}
