/*!
 * Stack Module
 * Browser stack trace parsing and source-position resolution
 */

pub mod frame;
pub mod parser;
pub mod resolver;

pub use frame::{render_stack, RawFrame, ResolvedFrame};
pub use parser::parse;
pub use resolver::{FrameResolver, ResolveOutcome};
