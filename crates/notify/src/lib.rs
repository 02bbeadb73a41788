//! Notification fan-out for recorded change events.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - A generic JSON webhook notifier
//! - Dispatcher that delivers to every channel concurrently, isolating
//!   slow or failing channels from one another

pub mod dispatcher;
pub mod traits;
pub mod webhook;

pub use dispatcher::Dispatcher;
pub use traits::{DispatchResult, Notifier, NotifyError};
pub use webhook::WebhookNotifier;
