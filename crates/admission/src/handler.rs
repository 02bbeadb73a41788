//! The synchronous decide-then-respond path.
//!
//! A request moves through decode, candidate construction, the block check
//! and the ignore check, and always ends with a response. The only deny is a
//! block-rule hit; every internal failure resolves to allow. Recording is a
//! non-blocking queue insert that drops the event when the queue is full.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use kubetrail_core::{event_id, ChangeEvent, Operation, Payload};
use kubetrail_diff::{compute_diff, filtered_snapshot};
use kubetrail_queue::EventQueue;
use kubetrail_rules::{should_block, should_ignore, RuleStore};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::envelope::{
    decode_review, salvage_identity, AdmissionRequest, AdmissionResponse, AdmissionReview,
    API_VERSION_V1,
};
use crate::provenance::{actor_from_user_info, detect_source_tool, labels_of};

/// Decisions slower than this are logged as warnings.
const LATENCY_BUDGET: Duration = Duration::from_millis(100);

/// How a request left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Matched a block rule; denied and recorded with `allowed=false`.
    Denied,
    /// Matched an ignore rule; allowed, nothing recorded.
    Skipped,
    /// Allowed and recorded.
    Recorded,
    /// Not an operation we track (e.g. CONNECT); allowed, nothing recorded.
    Untracked,
}

/// The allow/deny result for one decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub allowed: bool,
    /// Denial message; `None` for allows.
    pub message: Option<String>,
    pub outcome: Outcome,
    /// The event handed to the queue, if any.
    pub event: Option<ChangeEvent>,
}

impl Decision {
    fn allow(outcome: Outcome, event: Option<ChangeEvent>) -> Self {
        Self {
            allowed: true,
            message: None,
            outcome,
            event,
        }
    }

    fn into_response(self, uid: String) -> AdmissionResponse {
        match self.message {
            Some(message) if !self.allowed => AdmissionResponse::deny(uid, message),
            _ => AdmissionResponse::allow(uid),
        }
    }
}

/// Shared by every request; cheap to clone.
#[derive(Clone)]
pub struct AdmissionHandler {
    rules: Arc<RuleStore>,
    queue: EventQueue,
}

impl AdmissionHandler {
    pub fn new(rules: Arc<RuleStore>, queue: EventQueue) -> Self {
        Self { rules, queue }
    }

    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Decode a raw review body and answer it. Never fails.
    pub fn handle(&self, body: &[u8]) -> AdmissionReview {
        let started = Instant::now();

        let (api_version, request) = match decode_review(body) {
            Ok(decoded) => decoded,
            Err(e) => {
                let (api_version, uid) = salvage_identity(body);
                warn!(uid = %uid, error = %e, "failed to decode admission review, allowing");
                return AdmissionReview::respond(
                    &api_version,
                    AdmissionResponse::allow_with_diagnostic(
                        uid,
                        format!("kubetrail: request not evaluated: {e}"),
                    ),
                );
            }
        };

        let uid = request.uid.clone();
        let decision = self.decide(&request);

        let elapsed = started.elapsed();
        if elapsed > LATENCY_BUDGET {
            warn!(
                uid = %uid,
                elapsed_ms = elapsed.as_millis() as u64,
                "admission decision exceeded latency budget"
            );
        } else {
            debug!(uid = %uid, elapsed_us = elapsed.as_micros() as u64, outcome = ?decision.outcome, "admission decided");
        }

        AdmissionReview::respond(&api_version, decision.into_response(uid))
    }

    /// Answer a request whose body could not be read at all (too large,
    /// truncated). Nothing is known about it, so the uid is left empty.
    pub fn handle_unreadable(&self, reason: impl std::fmt::Display) -> AdmissionReview {
        warn!(error = %reason, "failed to read admission request body, allowing");
        AdmissionReview::respond(
            API_VERSION_V1,
            AdmissionResponse::allow_with_diagnostic(
                String::new(),
                format!("kubetrail: request not evaluated: {reason}"),
            ),
        )
    }

    /// Run block and ignore checks for a decoded request and enqueue the
    /// resulting event.
    pub fn decide(&self, request: &AdmissionRequest) -> Decision {
        let Some(operation) = Operation::from_wire(&request.operation) else {
            debug!(
                uid = %request.uid,
                operation = %request.operation,
                "untracked operation, allowing"
            );
            return Decision::allow(Outcome::Untracked, None);
        };

        // One snapshot per decision, so a concurrent reload can't mix rule sets.
        let rules = self.rules.snapshot();
        let mut event = build_candidate(request, operation);

        if let Some(hit) = should_block(&event, rules.block.as_deref()) {
            stamp(&mut event, Utc::now());
            event.allowed = false;
            event.matched_pattern = Some(hit.pattern.clone());
            info!(
                event_id = %event.id,
                user = %event.actor.username,
                namespace = %event.namespace,
                name = %event.name,
                pattern = %hit.pattern,
                dimension = %hit.dimension,
                "denied by block rule"
            );
            self.record(&event);
            return Decision {
                allowed: false,
                message: Some(hit.message),
                outcome: Outcome::Denied,
                event: Some(event),
            };
        }

        if should_ignore(&event, rules.ignore.as_deref()) {
            debug!(
                kind = %event.resource_kind,
                namespace = %event.namespace,
                name = %event.name,
                "ignored by rule"
            );
            return Decision::allow(Outcome::Skipped, None);
        }

        stamp(&mut event, Utc::now());
        event.allowed = true;
        self.record(&event);
        Decision::allow(Outcome::Recorded, Some(event))
    }

    fn record(&self, event: &ChangeEvent) {
        if let Err(e) = self.queue.try_enqueue(event.clone()) {
            warn!(
                event_id = %event.id,
                dropped_total = self.queue.dropped_count(),
                error = %e,
                "change event dropped"
            );
        }
    }
}

/// Assemble the unstamped event: identity, actor, provenance and payload.
fn build_candidate(request: &AdmissionRequest, operation: Operation) -> ChangeEvent {
    let kind = request.kind.kind.as_str();
    let object = request.object.as_ref();
    let old_object = request.old_object.as_ref();

    let payload = match operation {
        Operation::Update => Payload::from_diff(compute_diff(old_object, object, kind)),
        Operation::Delete => old_object
            .filter(|o| !o.is_null())
            .map(|o| Payload::ObjectSnapshot(filtered_snapshot(o, kind)))
            .unwrap_or_default(),
        _ => Payload::None,
    };

    let actor = actor_from_user_info(&request.user_info);
    let labels = labels_of(object.or(old_object));
    let source_tool = detect_source_tool(&actor.username, labels);

    ChangeEvent {
        id: String::new(),
        timestamp: DateTime::<Utc>::default(),
        operation,
        resource_kind: kind.to_string(),
        namespace: request.namespace.clone(),
        name: resolve_name(request),
        actor,
        source_tool,
        payload,
        allowed: true,
        matched_pattern: None,
    }
}

/// Assign the decision timestamp and the ID derived from it.
fn stamp(event: &mut ChangeEvent, now: DateTime<Utc>) {
    event.timestamp = now;
    event.id = event_id(event.operation, &event.resource_kind, &event.name, now);
}

/// Request name, else `metadata.name`, else `metadata.generateName`.
fn resolve_name(request: &AdmissionRequest) -> String {
    if !request.name.is_empty() {
        return request.name.clone();
    }
    let metadata = request
        .object
        .as_ref()
        .or(request.old_object.as_ref())
        .and_then(|o| o.get("metadata"));
    ["name", "generateName"]
        .iter()
        .filter_map(|key| metadata.and_then(|m| m.get(*key)).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}
