/*!
 * Core Module
 * Fundamental pipeline types and error handling
 */

pub mod config;
pub mod data_structures;
pub mod errors;
pub mod json;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::Config;
pub use data_structures::InlineString;
pub use errors::*;
pub use types::*;
