use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::CandidateId;
use super::repository::{CandidateRepository, RepositoryError, RuleSetRepository};
use super::review::{CandidateReview, CandidateSubmission, ReviewError};
use super::store::RuleStoreError;

/// Router builder exposing the administrative review surface.
pub fn review_router<R, C>(review: Arc<CandidateReview<R, C>>) -> Router
where
    R: RuleSetRepository + 'static,
    C: CandidateRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/admin/candidates",
            post(submit_handler::<R, C>).get(pending_handler::<R, C>),
        )
        .route(
            "/api/v1/admin/candidates/:candidate_id/diff",
            get(preview_handler::<R, C>),
        )
        .route(
            "/api/v1/admin/candidates/:candidate_id/approve",
            post(approve_handler::<R, C>),
        )
        .route(
            "/api/v1/admin/candidates/:candidate_id/reject",
            post(reject_handler::<R, C>),
        )
        .with_state(review)
}

#[derive(Debug, Deserialize)]
struct ApproveRequest {
    actor: String,
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    actor: String,
    reason: String,
}

async fn submit_handler<R, C>(
    State(review): State<Arc<CandidateReview<R, C>>>,
    axum::Json(submission): axum::Json<CandidateSubmission>,
) -> Response
where
    R: RuleSetRepository + 'static,
    C: CandidateRepository + 'static,
{
    match review.submit(submission) {
        Ok(candidate) => (StatusCode::ACCEPTED, axum::Json(candidate)).into_response(),
        Err(error) => review_error_response(error),
    }
}

async fn pending_handler<R, C>(State(review): State<Arc<CandidateReview<R, C>>>) -> Response
where
    R: RuleSetRepository + 'static,
    C: CandidateRepository + 'static,
{
    match review.pending(100) {
        Ok(candidates) => (StatusCode::OK, axum::Json(candidates)).into_response(),
        Err(error) => review_error_response(error),
    }
}

async fn preview_handler<R, C>(
    State(review): State<Arc<CandidateReview<R, C>>>,
    Path(candidate_id): Path<u64>,
) -> Response
where
    R: RuleSetRepository + 'static,
    C: CandidateRepository + 'static,
{
    match review.preview(CandidateId(candidate_id)) {
        Ok(preview) => (StatusCode::OK, axum::Json(preview)).into_response(),
        Err(error) => review_error_response(error),
    }
}

async fn approve_handler<R, C>(
    State(review): State<Arc<CandidateReview<R, C>>>,
    Path(candidate_id): Path<u64>,
    axum::Json(request): axum::Json<ApproveRequest>,
) -> Response
where
    R: RuleSetRepository + 'static,
    C: CandidateRepository + 'static,
{
    match review.approve(CandidateId(candidate_id), &request.actor) {
        Ok(rule_set) => (StatusCode::OK, axum::Json(rule_set)).into_response(),
        Err(error) => review_error_response(error),
    }
}

async fn reject_handler<R, C>(
    State(review): State<Arc<CandidateReview<R, C>>>,
    Path(candidate_id): Path<u64>,
    axum::Json(request): axum::Json<RejectRequest>,
) -> Response
where
    R: RuleSetRepository + 'static,
    C: CandidateRepository + 'static,
{
    match review.reject(CandidateId(candidate_id), &request.actor, &request.reason) {
        Ok(candidate) => (StatusCode::OK, axum::Json(candidate)).into_response(),
        Err(error) => review_error_response(error),
    }
}

fn review_error_response(error: ReviewError) -> Response {
    let payload = json!({ "error": error.to_string() });
    let status = match &error {
        ReviewError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ReviewError::Repository(RepositoryError::Conflict)
        | ReviewError::AlreadyDecided(_) => StatusCode::CONFLICT,
        ReviewError::Diff(_)
        | ReviewError::Store(RuleStoreError::InvalidPayload(_))
        | ReviewError::MissingRejectionReason
        | ReviewError::InvalidConfidence(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, axum::Json(payload)).into_response()
}
