//! The canonical record of one intercepted change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patch::PatchOperation;

/// Unique event identifier, derived from operation, kind, name and timestamp.
pub type EventId = String;

/// Kind tag whose `data` / `stringData` leaves are hashed before diffing.
pub const SENSITIVE_KIND: &str = "Secret";

/// The mutating operation that was intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    /// Produced only by the audit-log ingester, never by admission.
    Exec,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Exec => "EXEC",
        }
    }

    /// Map a wire operation string onto an admission operation.
    ///
    /// Only CREATE, UPDATE and DELETE are recognised; anything else
    /// (CONNECT, EXEC, garbage) yields `None`.
    pub fn from_wire(op: &str) -> Option<Self> {
        match op {
            "CREATE" => Some(Operation::Create),
            "UPDATE" => Some(Operation::Update),
            "DELETE" => Some(Operation::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort guess at what issued the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceTool {
    Kubectl,
    Helm,
    Controller,
    #[default]
    Unknown,
}

impl std::fmt::Display for SourceTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceTool::Kubectl => write!(f, "kubectl"),
            SourceTool::Helm => write!(f, "helm"),
            SourceTool::Controller => write!(f, "controller"),
            SourceTool::Unknown => write!(f, "unknown"),
        }
    }
}

/// Identity of whoever made the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Actor {
    pub username: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
}

/// Change payload. UPDATE carries a diff, DELETE a filtered snapshot of the
/// removed object, CREATE carries nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    #[default]
    None,
    Diff(Vec<PatchOperation>),
    ObjectSnapshot(serde_json::Value),
}

impl Payload {
    /// Wrap a diff, collapsing an empty one to [`Payload::None`].
    pub fn from_diff(ops: Vec<PatchOperation>) -> Self {
        if ops.is_empty() {
            Payload::None
        } else {
            Payload::Diff(ops)
        }
    }

    pub fn diff(&self) -> Option<&[PatchOperation]> {
        match self {
            Payload::Diff(ops) => Some(ops),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::ObjectSnapshot(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }
}

/// One observed operation, built once per intercepted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub resource_kind: String,
    pub namespace: String,
    pub name: String,
    pub actor: Actor,
    pub source_tool: SourceTool,
    #[serde(default, skip_serializing_if = "Payload::is_none")]
    pub payload: Payload,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
}

/// Derive the event ID from its identifying fields.
///
/// Uniqueness is practical rather than provable: it relies on the
/// nanosecond timestamp being assigned once per decision.
pub fn event_id(operation: Operation, kind: &str, name: &str, timestamp: DateTime<Utc>) -> EventId {
    // Out-of-range timestamps (beyond year 2262) fall back to microseconds.
    let nanos = timestamp
        .timestamp_nanos_opt()
        .unwrap_or_else(|| timestamp.timestamp_micros().saturating_mul(1_000));
    format!(
        "{}-{}-{}-{}",
        operation.as_str().to_lowercase(),
        kind.to_lowercase(),
        name,
        nanos
    )
}

impl ChangeEvent {
    /// Whether payload and decision fields agree with the operation.
    pub fn is_consistent(&self) -> bool {
        let payload_ok = match (&self.payload, self.operation) {
            (Payload::None, _) => true,
            (Payload::Diff(ops), Operation::Update) => !ops.is_empty(),
            (Payload::ObjectSnapshot(_), Operation::Delete) => true,
            _ => false,
        };
        let decision_ok = self.allowed
            || self
                .matched_pattern
                .as_deref()
                .is_some_and(|p| !p.is_empty());
        payload_ok && decision_ok
    }
}
