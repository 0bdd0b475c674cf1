/*!
 * Event Module
 * Event model, storage abstraction, and in-memory backend
 */

pub mod memory;
pub mod store;
pub mod types;

pub use memory::MemoryEventStore;
pub use store::{EventStore, StoreError, StoreResult, StoreStats};
pub use types::{
    BatchEnvelope, Envelope, EventFilter, EventKind, EventPayload, EventSummary, MessageLevel,
    ResolutionStatus, SessionStatus, StoredEvent,
};
