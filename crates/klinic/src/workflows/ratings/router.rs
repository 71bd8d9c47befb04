use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::RatingPrompt;
use super::ingest::{classify_all, AppointmentPayload};
use super::service::{RatingPromptService, ScanOutcome};
use super::status::RatingStatusSource;

/// Router builder exposing HTTP endpoints for the rating prompt workflow.
pub fn rating_prompt_router<S>(service: Arc<RatingPromptService<S>>) -> Router
where
    S: RatingStatusSource + 'static,
{
    Router::new()
        .route("/api/v1/ratings/prompt/scan", post(scan_handler::<S>))
        .route("/api/v1/ratings/prompt", get(pending_handler::<S>))
        .route(
            "/api/v1/ratings/prompt/acknowledge",
            post(acknowledge_handler::<S>),
        )
        .with_state(service)
}

/// One appointments snapshot as pushed by the caller.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub appointments: Vec<AppointmentPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub outcome: &'static str,
    pub status_checks: Option<usize>,
    pub pending_prompt: Option<RatingPrompt>,
}

pub(crate) async fn scan_handler<S>(
    State(service): State<Arc<RatingPromptService<S>>>,
    axum::Json(request): axum::Json<ScanRequest>,
) -> Response
where
    S: RatingStatusSource + 'static,
{
    let roster = classify_all(request.appointments);
    let outcome = service.scan(&roster).await;
    let status_checks = match outcome {
        ScanOutcome::Completed { status_checks, .. } => Some(status_checks),
        _ => None,
    };
    let payload = ScanResponse {
        outcome: outcome.label(),
        status_checks,
        pending_prompt: service.pending_prompt(),
    };
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn pending_handler<S>(
    State(service): State<Arc<RatingPromptService<S>>>,
) -> Response
where
    S: RatingStatusSource + 'static,
{
    let payload = json!({
        "pendingPrompt": service.pending_prompt(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn acknowledge_handler<S>(
    State(service): State<Arc<RatingPromptService<S>>>,
) -> Response
where
    S: RatingStatusSource + 'static,
{
    let cleared = service.acknowledge();
    let payload = json!({
        "cleared": cleared.is_some(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}
