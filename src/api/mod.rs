/*!
 * API Module
 * HTTP surface: ingestion, uploads, reads, live streams, health
 */

pub mod server;
pub mod types;

pub use server::{router, serve, AppState};
pub use types::{ApiError, HealthResponse, ReplayResponse, UploadResponse};
