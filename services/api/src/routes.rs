use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;

use visa_rules::workflows::checklist::{
    checklist_router, ChecklistRepository, ChecklistService, LegacyTemplateProvider,
};
use visa_rules::workflows::metrics::GenerationMetrics;
use visa_rules::workflows::rules::{
    review_router, CandidateRepository, CandidateReview, RuleSetRepository,
};

use crate::infra::AppState;

/// Trailing window reported by the generation summary endpoint when the
/// caller does not pick one.
const DEFAULT_SUMMARY_WINDOW_HOURS: u32 = 24;

#[derive(Debug, Deserialize)]
struct SummaryParams {
    window_hours: Option<u32>,
}

pub(crate) fn app_router<R, C, L, K>(
    review: Arc<CandidateReview<R, C>>,
    checklists: Arc<ChecklistService<R, L, K>>,
    metrics: Arc<GenerationMetrics<K>>,
) -> Router
where
    R: RuleSetRepository + 'static,
    C: CandidateRepository + 'static,
    L: LegacyTemplateProvider + 'static,
    K: ChecklistRepository + 'static,
{
    review_router(review)
        .merge(checklist_router(checklists))
        .merge(
            Router::new()
                .route(
                    "/api/v1/metrics/generation",
                    get(generation_summary_endpoint::<K>),
                )
                .with_state(metrics),
        )
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn generation_summary_endpoint<K>(
    State(metrics): State<Arc<GenerationMetrics<K>>>,
    Query(params): Query<SummaryParams>,
) -> Response
where
    K: ChecklistRepository + 'static,
{
    let window_hours = params.window_hours.unwrap_or(DEFAULT_SUMMARY_WINDOW_HOURS);
    match metrics.summary(window_hours) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
