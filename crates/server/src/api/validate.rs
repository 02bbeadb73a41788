use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::Json;
use kubetrail_admission::AdmissionReview;

use crate::state::AppState;

/// `POST /validate`: answer one AdmissionReview.
///
/// The body is taken raw so that malformed reviews still reach the handler
/// and get a fail-open answer instead of an extractor rejection. A body that
/// cannot be read at all (over the size limit, cut off) is answered the same
/// way, never with a 4xx.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Json<AdmissionReview> {
    match body {
        Ok(body) => Json(state.handler.handle(&body)),
        Err(rejection) => Json(state.handler.handle_unreadable(rejection.body_text())),
    }
}
