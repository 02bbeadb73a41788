//! Queue and store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue full (capacity {0}), event dropped")]
    Full(usize),

    #[error("queue closed, event dropped")]
    Closed,

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
