//! Bounded producer side of the event hand-off.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kubetrail_core::ChangeEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::QueueError;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Consumer side, owned by the single processor task.
pub type EventReceiver = mpsc::Receiver<ChangeEvent>;

/// Cloneable, never-blocking producer handle.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<ChangeEvent>,
    dropped: Arc<AtomicU64>,
}

/// Create a bounded queue with the given capacity.
///
/// # Panics
///
/// Panics if `capacity` is zero (see `Config::validate`).
pub fn event_queue(capacity: usize) -> (EventQueue, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        EventQueue {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

impl EventQueue {
    /// Insert without waiting. A full or closed queue drops the event.
    pub fn try_enqueue(&self, event: ChangeEvent) -> Result<(), QueueError> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(QueueError::Full(self.capacity()))
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(QueueError::Closed)
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Events currently waiting for the processor.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Events dropped since startup because the queue was full or closed.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
