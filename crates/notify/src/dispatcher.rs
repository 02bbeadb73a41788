//! Routes change events to configured channels.
//!
//! Every channel is driven concurrently and bounded by its own timeout, so
//! a hung endpoint can't hold back the others. Per-channel results are
//! returned for logging only; nothing retries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use kubetrail_core::ChangeEvent;

use crate::traits::{DispatchResult, Notifier, NotifyError};

/// Fans an event out to all configured channels.
pub struct Dispatcher {
    channels: Vec<Arc<dyn Notifier>>,
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over the given channels with a per-channel timeout.
    pub fn new(channels: Vec<Arc<dyn Notifier>>, timeout: Duration) -> Self {
        Self { channels, timeout }
    }

    /// A dispatcher with no channels.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Duration::from_secs(10))
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Deliver `event` to every channel concurrently.
    ///
    /// Individual failures and timeouts don't affect other channels.
    pub async fn dispatch(&self, event: &ChangeEvent) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(event_id = %event.id, "no notification channels configured");
            return Vec::new();
        }

        let deliveries = self
            .channels
            .iter()
            .map(|channel| self.deliver(channel.as_ref(), event));
        join_all(deliveries).await
    }

    async fn deliver(&self, channel: &dyn Notifier, event: &ChangeEvent) -> DispatchResult {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, channel.send(event)).await {
            Ok(sent) => sent,
            Err(_) => Err(NotifyError::Timeout(self.timeout)),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let (success, error) = match result {
            Ok(()) => {
                tracing::debug!(
                    event_id = %event.id,
                    channel = channel.channel_name(),
                    duration_ms,
                    "notification delivered"
                );
                (true, None)
            }
            Err(e) => {
                tracing::warn!(
                    event_id = %event.id,
                    channel = channel.channel_name(),
                    error = %e,
                    duration_ms,
                    "notification delivery failed"
                );
                (false, Some(e.to_string()))
            }
        };

        DispatchResult {
            channel: channel.channel_name().to_string(),
            event_id: event.id.clone(),
            success,
            error,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use kubetrail_core::{Actor, Operation, Payload, SourceTool};

    enum Behaviour {
        Accept,
        Reject,
        Hang,
    }

    /// Fake channel that counts calls and acts per `behaviour`.
    struct FakeChannel {
        label: &'static str,
        behaviour: Behaviour,
        calls: Arc<AtomicUsize>,
    }

    fn channel(label: &'static str, behaviour: Behaviour) -> (Arc<dyn Notifier>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fake = FakeChannel {
            label,
            behaviour,
            calls: Arc::clone(&calls),
        };
        (Arc::new(fake), calls)
    }

    #[async_trait::async_trait]
    impl Notifier for FakeChannel {
        async fn send(&self, _event: &ChangeEvent) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Accept => Ok(()),
                Behaviour::Reject => Err(NotifyError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                }),
                Behaviour::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }

        fn channel_name(&self) -> &str {
            self.label
        }
    }

    fn scale_event() -> ChangeEvent {
        ChangeEvent {
            id: "update-deployment-web-1".to_string(),
            timestamp: Utc::now(),
            operation: Operation::Update,
            resource_kind: "Deployment".to_string(),
            namespace: "default".to_string(),
            name: "web".to_string(),
            actor: Actor::default(),
            source_tool: SourceTool::Kubectl,
            payload: Payload::None,
            allowed: true,
            matched_pattern: None,
        }
    }

    #[tokio::test]
    async fn every_channel_receives_the_event() {
        let (slack, slack_calls) = channel("slack-hook", Behaviour::Accept);
        let (siem, siem_calls) = channel("siem-hook", Behaviour::Accept);
        let dispatcher = Dispatcher::new(vec![slack, siem], Duration::from_secs(1));
        assert_eq!(dispatcher.len(), 2);

        let results = dispatcher.dispatch(&scale_event()).await;
        let channels: Vec<_> = results.iter().map(|r| r.channel.as_str()).collect();
        assert_eq!(channels, ["slack-hook", "siem-hook"]);
        assert!(results.iter().all(|r| r.success && r.event_id == "update-deployment-web-1"));
        assert_eq!(slack_calls.load(Ordering::SeqCst), 1);
        assert_eq!(siem_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejecting_channel_is_isolated() {
        let (broken, _) = channel("broken", Behaviour::Reject);
        let (healthy, healthy_calls) = channel("healthy", Behaviour::Accept);
        let dispatcher = Dispatcher::new(vec![broken, healthy], Duration::from_secs(1));

        let results = dispatcher.dispatch(&scale_event()).await;
        let broken = &results[0];
        assert!(!broken.success);
        assert!(broken.error.as_deref().is_some_and(|e| e.contains("502")));
        assert!(results[1].success);
        assert_eq!(healthy_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hung_channel_is_cut_off_by_timeout() {
        let (hung, hung_calls) = channel("hung", Behaviour::Hang);
        let (quick, quick_calls) = channel("quick", Behaviour::Accept);
        let dispatcher = Dispatcher::new(vec![hung, quick], Duration::from_millis(50));

        let started = Instant::now();
        let results = dispatcher.dispatch(&scale_event()).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(hung_calls.load(Ordering::SeqCst), 1);
        assert!(results[0].error.as_deref().is_some_and(|e| e.contains("timed out")));
        assert!(results[1].success);
        assert_eq!(quick_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_dispatcher_does_nothing() {
        let dispatcher = Dispatcher::empty();
        assert!(dispatcher.is_empty());
        assert!(dispatcher.dispatch(&scale_event()).await.is_empty());
    }
}
