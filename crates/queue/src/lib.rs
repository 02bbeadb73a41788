//! Hand-off between the decision path and best-effort persistence.
//!
//! This crate provides:
//! - `EventQueue`: bounded, non-blocking producer side (drop-on-full)
//! - `EventStore` trait with in-memory and log-backed implementations
//! - `EventProcessor`: the single consumer that stores and notifies

pub mod error;
pub mod processor;
pub mod queue;
pub mod store;

pub use error::QueueError;
pub use processor::{spawn_processor, EventProcessor, ProcessorMetrics};
pub use queue::{event_queue, EventQueue, EventReceiver, DEFAULT_QUEUE_CAPACITY};
pub use store::{EventStore, LogStore, MemoryStore};
