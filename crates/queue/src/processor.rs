//! Single consumer draining the event queue.
//!
//! Each event is saved once (no retry) and then handed to the notification
//! dispatcher on a detached task, so a slow channel never delays the next
//! save. At most `max_in_flight` dispatches run at once; an event arriving
//! while every slot is busy is stored but not notified. On shutdown anything
//! still queued is abandoned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kubetrail_core::ChangeEvent;
use kubetrail_notify::Dispatcher;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::queue::EventReceiver;
use crate::store::EventStore;

pub const DEFAULT_MAX_IN_FLIGHT_DISPATCHES: usize = 64;

/// Counters exposed for health reporting.
#[derive(Debug, Default)]
pub struct ProcessorMetrics {
    pub processed: AtomicU64,
    pub store_failures: AtomicU64,
    /// Events not notified because every dispatch slot was taken.
    pub notifications_dropped: AtomicU64,
}

pub struct EventProcessor {
    store: Arc<dyn EventStore>,
    dispatcher: Option<Arc<Dispatcher>>,
    dispatch_slots: Arc<Semaphore>,
    metrics: Arc<ProcessorMetrics>,
}

impl EventProcessor {
    pub fn new(store: Arc<dyn EventStore>, dispatcher: Option<Arc<Dispatcher>>) -> Self {
        Self {
            store,
            dispatcher: dispatcher.filter(|d| !d.is_empty()),
            dispatch_slots: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT_DISPATCHES)),
            metrics: Arc::new(ProcessorMetrics::default()),
        }
    }

    /// Cap concurrent dispatches at `max_in_flight` (at least one).
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.dispatch_slots = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    pub fn metrics(&self) -> Arc<ProcessorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Store one event, then fire off notifications. Never fails.
    pub async fn process(&self, event: ChangeEvent) {
        if let Err(e) = self.store.save(&event).await {
            self.metrics.store_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                event_id = %event.id,
                store = self.store.name(),
                error = %e,
                "failed to save change event, dropping"
            );
        }
        self.metrics.processed.fetch_add(1, Ordering::Relaxed);

        if let Some(dispatcher) = &self.dispatcher {
            let Ok(slot) = Arc::clone(&self.dispatch_slots).try_acquire_owned() else {
                self.metrics.notifications_dropped.fetch_add(1, Ordering::Relaxed);
                warn!(event_id = %event.id, "all dispatch slots busy, skipping notification");
                return;
            };
            let dispatcher = Arc::clone(dispatcher);
            tokio::spawn(async move {
                let _slot = slot;
                let results = dispatcher.dispatch(&event).await;
                let failed = results.iter().filter(|r| !r.success).count();
                if failed > 0 {
                    warn!(
                        event_id = %event.id,
                        failed,
                        total = results.len(),
                        "some notification channels failed"
                    );
                }
            });
        }
    }

    /// Drain `rx` until it closes or `shutdown` flips to `true`.
    pub async fn run(self, mut rx: EventReceiver, mut shutdown: watch::Receiver<bool>) {
        info!(store = self.store.name(), "event processor started");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = rx.recv() => match received {
                    Some(event) => self.process(event).await,
                    None => break,
                },
            }
        }
        let abandoned = rx.len();
        info!(abandoned, "event processor stopped");
    }
}

/// Spawn the processor as a background task.
pub fn spawn_processor(
    processor: EventProcessor,
    rx: EventReceiver,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(processor.run(rx, shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use kubetrail_core::{Actor, Operation, Payload, SourceTool};
    use kubetrail_notify::{Notifier, NotifyError};

    use crate::error::QueueError;
    use crate::queue::event_queue;
    use crate::store::MemoryStore;

    struct FailingStore {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl EventStore for FailingStore {
        async fn save(&self, _event: &ChangeEvent) -> Result<(), QueueError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(QueueError::Store("database unavailable".to_string()))
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    struct CountingNotifier {
        sent: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send(&self, _event: &ChangeEvent) -> Result<(), NotifyError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn channel_name(&self) -> &str {
            "counting"
        }
    }

    fn event(name: &str) -> ChangeEvent {
        ChangeEvent {
            id: format!("update-deployment-{name}-1"),
            timestamp: Utc::now(),
            operation: Operation::Update,
            resource_kind: "Deployment".to_string(),
            namespace: "default".to_string(),
            name: name.to_string(),
            actor: Actor::default(),
            source_tool: SourceTool::Kubectl,
            payload: Payload::None,
            allowed: true,
            matched_pattern: None,
        }
    }

    async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn drains_queue_into_store() {
        let store = Arc::new(MemoryStore::new(100));
        let (queue, rx) = event_queue(10);
        let (_tx, shutdown) = watch::channel(false);

        let handle = spawn_processor(EventProcessor::new(store.clone(), None), rx, shutdown);
        queue.try_enqueue(event("a")).unwrap();
        queue.try_enqueue(event("b")).unwrap();

        assert!(wait_for(|| store.len() == 2).await);
        let ids: Vec<_> = store.recent(2).into_iter().map(|e| e.name).collect();
        assert_eq!(ids, vec!["b", "a"]);

        drop(queue);
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn store_failure_is_not_retried_and_processing_continues() {
        let store = Arc::new(FailingStore {
            attempts: AtomicUsize::new(0),
        });
        let processor = EventProcessor::new(store.clone(), None);
        let metrics = processor.metrics();

        processor.process(event("a")).await;
        processor.process(event("b")).await;

        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.store_failures.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.processed.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn notifies_even_when_store_fails() {
        let sent = Arc::new(AtomicUsize::new(0));
        let channels: Vec<Arc<dyn Notifier>> = vec![Arc::new(CountingNotifier { sent: sent.clone() })];
        let dispatcher = Arc::new(Dispatcher::new(channels, Duration::from_secs(1)));
        let store = Arc::new(FailingStore {
            attempts: AtomicUsize::new(0),
        });

        let processor = EventProcessor::new(store, Some(dispatcher));
        processor.process(event("a")).await;

        assert!(wait_for(|| sent.load(Ordering::SeqCst) == 1).await);
    }

    struct StuckNotifier {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Notifier for StuckNotifier {
        async fn send(&self, _event: &ChangeEvent) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
            Ok(())
        }
        fn channel_name(&self) -> &str {
            "stuck"
        }
    }

    #[tokio::test]
    async fn busy_dispatch_slots_skip_notification_but_still_store() {
        let calls = Arc::new(AtomicUsize::new(0));
        let channels: Vec<Arc<dyn Notifier>> = vec![Arc::new(StuckNotifier { calls: calls.clone() })];
        let dispatcher = Arc::new(Dispatcher::new(channels, Duration::from_secs(60)));
        let store = Arc::new(MemoryStore::new(10));

        let processor = EventProcessor::new(store.clone(), Some(dispatcher)).with_max_in_flight(1);
        let metrics = processor.metrics();
        processor.process(event("a")).await;
        processor.process(event("b")).await;
        processor.process(event("c")).await;

        assert_eq!(store.len(), 3);
        assert_eq!(metrics.notifications_dropped.load(Ordering::Relaxed), 2);
        assert!(wait_for(|| calls.load(Ordering::SeqCst) == 1).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let store = Arc::new(MemoryStore::new(10));
        let (_queue, rx) = event_queue(10);
        let (tx, shutdown) = watch::channel(false);

        let handle = spawn_processor(EventProcessor::new(store, None), rx, shutdown);
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("processor stops on shutdown")
            .unwrap();
    }
}
