/*!
 * Resolution Queue Module
 * Task shape, in-memory broker, and the worker pool
 */

pub mod memory;
pub mod traits;
pub mod worker;

pub use memory::MemoryTaskQueue;
pub use traits::{QueueError, QueueResult, QueueStats, ResolveTask, TaskQueue};
pub use worker::{WorkerPool, WorkerStats};
