use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub dropped_events: u64,
    pub processed_events: u64,
    pub store_failures: u64,
    pub notifications_dropped: u64,
    pub ignore_patterns: usize,
    pub block_patterns: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let queue = state.handler.queue();
    let rules = state.handler.rules().snapshot();
    let metrics = &state.processor_metrics;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        queue_depth: queue.depth(),
        queue_capacity: queue.capacity(),
        dropped_events: queue.dropped_count(),
        processed_events: metrics.processed.load(Ordering::Relaxed),
        store_failures: metrics.store_failures.load(Ordering::Relaxed),
        notifications_dropped: metrics.notifications_dropped.load(Ordering::Relaxed),
        ignore_patterns: rules.ignore.as_ref().map_or(0, |r| r.pattern_count()),
        block_patterns: rules.block.as_ref().map_or(0, |r| r.pattern_count()),
    })
}
