use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::workflows::identity::ActorContext;
use crate::workflows::outbound::Notifier;
use crate::workflows::projects::domain::ProjectId;
use crate::workflows::projects::repository::ProjectRepository;

use super::domain::{ApplicationDraft, ApplicationId, EstimatedTime, StudentSnapshot};
use super::repository::ApplicationRepository;
use super::selection::{SelectionCoordinator, SelectionError};

/// Router builder exposing HTTP endpoints for application intake and the
/// selection decision.
pub fn application_router<P, A, N>(service: Arc<SelectionCoordinator<P, A, N>>) -> Router
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/projects/:project_id/applications",
            post(apply_handler::<P, A, N>).get(list_handler::<P, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler::<P, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/shortlist",
            post(shortlist_handler::<P, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_handler::<P, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<P, A, N>),
        )
        .route(
            "/api/v1/applications/:application_id/withdraw",
            post(withdraw_handler::<P, A, N>),
        )
        .route(
            "/api/v1/students/me/applications/stats",
            get(stats_handler::<P, A, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyRequest {
    pub cover_letter: String,
    pub proposed_price: u64,
    pub estimated_time: EstimatedTime,
    pub snapshot: SnapshotPayload,
}

/// Apply-time profile snapshot supplied by the upstream profile service.
#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotPayload {
    pub name: String,
    #[serde(default)]
    pub college: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    pub reason: String,
}

pub(crate) async fn apply_handler<P, A, N>(
    State(service): State<Arc<SelectionCoordinator<P, A, N>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
    axum::Json(request): axum::Json<ApplyRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    let Some(student) = actor.as_student() else {
        return error_response(SelectionError::Forbidden);
    };

    let draft = ApplicationDraft {
        cover_letter: request.cover_letter,
        proposed_price: request.proposed_price,
        estimated_time: request.estimated_time,
    };
    let snapshot = StudentSnapshot {
        name: request.snapshot.name,
        college: request.snapshot.college,
        city: request.snapshot.city,
        skills: request.snapshot.skills,
        resume_url: request.snapshot.resume_url,
        captured_at: Utc::now(),
    };

    match service.apply(student, &ProjectId(project_id), draft, snapshot) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<P, A, N>(
    State(service): State<Arc<SelectionCoordinator<P, A, N>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    match service.for_project(&ProjectId(project_id), &actor) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<P, A, N>(
    State(service): State<Arc<SelectionCoordinator<P, A, N>>>,
    Path(application_id): Path<String>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    match service.get(&ApplicationId(application_id), &actor) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn shortlist_handler<P, A, N>(
    State(service): State<Arc<SelectionCoordinator<P, A, N>>>,
    Path(application_id): Path<String>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    match service.shortlist(&ApplicationId(application_id), &actor) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<P, A, N>(
    State(service): State<Arc<SelectionCoordinator<P, A, N>>>,
    Path(application_id): Path<String>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    match service.approve(&ApplicationId(application_id), &actor) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_handler<P, A, N>(
    State(service): State<Arc<SelectionCoordinator<P, A, N>>>,
    Path(application_id): Path<String>,
    actor: ActorContext,
    axum::Json(request): axum::Json<RejectRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    match service.reject(&ApplicationId(application_id), &actor, request.reason) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn withdraw_handler<P, A, N>(
    State(service): State<Arc<SelectionCoordinator<P, A, N>>>,
    Path(application_id): Path<String>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    match service.withdraw(&ApplicationId(application_id), &actor) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn stats_handler<P, A, N>(
    State(service): State<Arc<SelectionCoordinator<P, A, N>>>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    N: Notifier + 'static,
{
    match service.stats(&actor) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: SelectionError) -> Response {
    let status = match &error {
        SelectionError::ApplicationNotFound | SelectionError::ProjectNotFound => {
            StatusCode::NOT_FOUND
        }
        SelectionError::Forbidden => StatusCode::FORBIDDEN,
        SelectionError::AlreadyApplied | SelectionError::Conflict => StatusCode::CONFLICT,
        SelectionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SelectionError::ProjectNotOpen { .. }
        | SelectionError::ProjectAssigned
        | SelectionError::Application(_)
        | SelectionError::Project(_) => StatusCode::BAD_REQUEST,
        SelectionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
