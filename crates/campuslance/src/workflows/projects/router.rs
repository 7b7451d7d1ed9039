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

use crate::workflows::identity::ActorContext;

use super::catalog::{CatalogError, ProjectCatalog};
use super::domain::ProjectId;
use super::repository::ProjectRepository;

/// Router builder exposing project publication and the open board.
pub fn project_router<P>(service: Arc<ProjectCatalog<P>>) -> Router
where
    P: ProjectRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/projects",
            post(create_handler::<P>).get(board_handler::<P>),
        )
        .route("/api/v1/projects/:project_id", get(get_handler::<P>))
        .route(
            "/api/v1/projects/:project_id/cancel",
            post(cancel_handler::<P>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CancelRequest {
    pub reason: String,
}

pub(crate) async fn create_handler<P>(
    State(service): State<Arc<ProjectCatalog<P>>>,
    actor: ActorContext,
    axum::Json(draft): axum::Json<super::domain::ProjectDraft>,
) -> Response
where
    P: ProjectRepository + 'static,
{
    match service.create(&actor, draft) {
        Ok(project) => (StatusCode::CREATED, axum::Json(project)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn board_handler<P>(State(service): State<Arc<ProjectCatalog<P>>>) -> Response
where
    P: ProjectRepository + 'static,
{
    match service.open_projects() {
        Ok(projects) => (StatusCode::OK, axum::Json(projects)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<P>(
    State(service): State<Arc<ProjectCatalog<P>>>,
    Path(project_id): Path<String>,
) -> Response
where
    P: ProjectRepository + 'static,
{
    match service.get(&ProjectId(project_id)) {
        Ok(project) => (StatusCode::OK, axum::Json(project)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<P>(
    State(service): State<Arc<ProjectCatalog<P>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
    axum::Json(request): axum::Json<CancelRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
{
    match service.cancel(&ProjectId(project_id), &actor, request.reason) {
        Ok(project) => (StatusCode::OK, axum::Json(project)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: CatalogError) -> Response {
    let status = match &error {
        CatalogError::NotFound => StatusCode::NOT_FOUND,
        CatalogError::Forbidden => StatusCode::FORBIDDEN,
        CatalogError::Conflict => StatusCode::CONFLICT,
        CatalogError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CatalogError::Project(_) => StatusCode::BAD_REQUEST,
        CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
