use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use crate::workflows::rules::RuleSetRepository;

use super::domain::ApplicationId;
use super::generator::LegacyTemplateProvider;
use super::repository::ChecklistRepository;
use super::service::{ChecklistRequest, ChecklistService};

/// Router builder exposing checklist generation and status polling.
pub fn checklist_router<R, L, C>(service: Arc<ChecklistService<R, L, C>>) -> Router
where
    R: RuleSetRepository + 'static,
    L: LegacyTemplateProvider + 'static,
    C: ChecklistRepository + 'static,
{
    Router::new()
        .route("/api/v1/checklists", post(generate_handler::<R, L, C>))
        .route(
            "/api/v1/checklists/:application_id",
            get(status_handler::<R, L, C>),
        )
        .with_state(service)
}

async fn generate_handler<R, L, C>(
    State(service): State<Arc<ChecklistService<R, L, C>>>,
    axum::Json(request): axum::Json<ChecklistRequest>,
) -> Response
where
    R: RuleSetRepository + 'static,
    L: LegacyTemplateProvider + 'static,
    C: ChecklistRepository + 'static,
{
    match service.generate(request) {
        Ok(checklist) => (StatusCode::OK, axum::Json(checklist)).into_response(),
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

async fn status_handler<R, L, C>(
    State(service): State<Arc<ChecklistService<R, L, C>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: RuleSetRepository + 'static,
    L: LegacyTemplateProvider + 'static,
    C: ChecklistRepository + 'static,
{
    let id = ApplicationId(application_id);
    match service.get(&id) {
        Ok(Some(checklist)) => (StatusCode::OK, axum::Json(checklist)).into_response(),
        Ok(None) => {
            let payload = json!({
                "application_id": id.0,
                "error": "no checklist generated for this application",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
