//! HTTP router construction.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::api;
use crate::state::AppState;

/// An UPDATE review carries both the new and the old object, each of which
/// the API server lets grow to 3 MiB, plus the envelope around them.
/// Anything larger is still answered (allowed, with a warning) by `/validate`.
pub const MAX_REVIEW_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    build_router_with_limit(state, MAX_REVIEW_BYTES)
}

pub fn build_router_with_limit(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/validate", post(api::validate))
        .route("/health", get(api::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
