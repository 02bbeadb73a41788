//! Event persistence collaborators.
//!
//! The durable store lives outside this workspace; these implementations
//! cover local runs and tests. Records are keyed by event ID and carry the
//! payload as a structured document.

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;
use kubetrail_core::ChangeEvent;

use crate::error::QueueError;

/// Persistence backend for recorded events. A failed save is not retried.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn save(&self, event: &ChangeEvent) -> Result<(), QueueError>;

    /// Short backend name for logs (e.g., "memory").
    fn name(&self) -> &str;
}

/// Bounded in-memory store with FIFO eviction.
pub struct MemoryStore {
    events: RwLock<VecDeque<ChangeEvent>>,
    max_events: usize,
}

impl MemoryStore {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.read().expect("memory store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a stored event by ID.
    pub fn get(&self, id: &str) -> Option<ChangeEvent> {
        let guard = self.events.read().expect("memory store lock poisoned");
        guard.iter().find(|e| e.id == id).cloned()
    }

    /// Up to `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ChangeEvent> {
        let guard = self.events.read().expect("memory store lock poisoned");
        guard.iter().rev().take(limit).cloned().collect()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn save(&self, event: &ChangeEvent) -> Result<(), QueueError> {
        if self.max_events == 0 {
            return Err(QueueError::Store("memory store has zero capacity".to_string()));
        }
        let mut guard = self.events.write().expect("memory store lock poisoned");
        guard.push_back(event.clone());
        while guard.len() > self.max_events {
            guard.pop_front();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Emits every event as one structured JSON log record under the
/// `kubetrail::events` target, for shipping by an external log collector.
#[derive(Debug, Default)]
pub struct LogStore;

#[async_trait]
impl EventStore for LogStore {
    async fn save(&self, event: &ChangeEvent) -> Result<(), QueueError> {
        let record = serde_json::to_string(event)?;
        tracing::info!(
            target: "kubetrail::events",
            event_id = %event.id,
            allowed = event.allowed,
            record = %record,
            "change event"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kubetrail_core::{Actor, Operation, Payload, SourceTool};

    fn event(id: &str) -> ChangeEvent {
        ChangeEvent {
            id: id.to_string(),
            timestamp: Utc::now(),
            operation: Operation::Delete,
            resource_kind: "ConfigMap".to_string(),
            namespace: "default".to_string(),
            name: "cfg".to_string(),
            actor: Actor::default(),
            source_tool: SourceTool::Unknown,
            payload: Payload::ObjectSnapshot(serde_json::json!({"data": {"k": "v"}})),
            allowed: true,
            matched_pattern: None,
        }
    }

    #[tokio::test]
    async fn memory_store_evicts_oldest() {
        let store = MemoryStore::new(2);
        for id in ["a", "b", "c"] {
            store.save(&event(id)).await.unwrap();
        }
        assert_eq!(store.len(), 2);
        assert!(store.get("a").is_none());
        let ids: Vec<_> = store.recent(10).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn memory_store_keeps_payload() {
        let store = MemoryStore::new(10);
        store.save(&event("x")).await.unwrap();
        let stored = store.get("x").unwrap();
        assert_eq!(stored.payload.snapshot().unwrap()["data"]["k"], "v");
    }

    #[tokio::test]
    async fn zero_capacity_memory_store_fails() {
        let store = MemoryStore::new(0);
        assert!(store.save(&event("x")).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn log_store_accepts_events() {
        assert!(LogStore.save(&event("x")).await.is_ok());
        assert_eq!(LogStore.name(), "log");
    }
}
