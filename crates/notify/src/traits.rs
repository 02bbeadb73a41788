//! Notifier trait definition and shared error types.

use std::time::Duration;

use kubetrail_core::ChangeEvent;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one change event through this channel.
    async fn send(&self, event: &ChangeEvent) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "webhook").
    fn channel_name(&self) -> &str;
}

/// Result of dispatching an event to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub event_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
