use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::workflows::identity::ActorContext;
use crate::workflows::outbound::{FileStore, Notifier, PaymentGateway};
use crate::workflows::payments::repository::{EarningsLedger, PaymentRepository};
use crate::workflows::projects::domain::ProjectId;
use crate::workflows::projects::record::ProjectRecord;
use crate::workflows::projects::repository::ProjectRepository;

use super::coordinator::{
    AttachmentUpload, SubmissionError, WorkSubmission, WorkSubmissionCoordinator,
};

/// Router builder exposing the project workspace endpoints.
pub fn workspace_router<P, Y, G, L, N, F>(
    service: Arc<WorkSubmissionCoordinator<P, Y, G, L, N, F>>,
) -> Router
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/workspace/:project_id/start-work",
            post(start_work_handler::<P, Y, G, L, N, F>),
        )
        .route(
            "/api/v1/workspace/:project_id/submit-work",
            post(submit_work_handler::<P, Y, G, L, N, F>),
        )
        .route(
            "/api/v1/workspace/:project_id/approve",
            post(approve_handler::<P, Y, G, L, N, F>),
        )
        .route(
            "/api/v1/workspace/:project_id/request-revision",
            post(request_revision_handler::<P, Y, G, L, N, F>),
        )
        .route(
            "/api/v1/workspace/:project_id/reject",
            post(reject_handler::<P, Y, G, L, N, F>),
        )
        .route(
            "/api/v1/workspace/:project_id/submissions",
            get(history_handler::<P, Y, G, L, N, F>),
        )
        .route(
            "/api/v1/workspace/:project_id/submissions/current",
            get(current_handler::<P, Y, G, L, N, F>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitWorkRequest {
    #[serde(default)]
    pub files: Vec<FilePayload>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilePayload {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct ApproveRequest {
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReasonRequest {
    pub reason: String,
}

/// Trimmed project state echoed back after workspace transitions.
#[derive(Debug, Serialize)]
pub(crate) struct WorkspaceProjectView {
    pub project_id: ProjectId,
    pub status: &'static str,
    pub revision_count: u32,
    pub max_revisions_allowed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<&'static str>,
}

impl WorkspaceProjectView {
    fn from_record(project: &ProjectRecord) -> Self {
        Self {
            project_id: project.id.clone(),
            status: project.status.label(),
            revision_count: project.revision_count,
            max_revisions_allowed: project.max_revisions_allowed,
            payment_status: project.payment_status.map(|s| s.label()),
        }
    }
}

pub(crate) async fn start_work_handler<P, Y, G, L, N, F>(
    State(service): State<Arc<WorkSubmissionCoordinator<P, Y, G, L, N, F>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    match service.start_work(&ProjectId(project_id), &actor) {
        Ok(project) => (
            StatusCode::OK,
            axum::Json(WorkspaceProjectView::from_record(&project)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_work_handler<P, Y, G, L, N, F>(
    State(service): State<Arc<WorkSubmissionCoordinator<P, Y, G, L, N, F>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
    axum::Json(request): axum::Json<SubmitWorkRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    let payload = WorkSubmission {
        attachments: request
            .files
            .into_iter()
            .map(|file| AttachmentUpload {
                name: file.name,
                content: file.content.into_bytes(),
            })
            .collect(),
        links: request.links,
        message: request.message,
    };

    match service.submit_work(&ProjectId(project_id), &actor, payload) {
        Ok((project, submission)) => (
            StatusCode::OK,
            axum::Json(json!({
                "project": WorkspaceProjectView::from_record(&project),
                "submission": submission,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<P, Y, G, L, N, F>(
    State(service): State<Arc<WorkSubmissionCoordinator<P, Y, G, L, N, F>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
    axum::Json(request): axum::Json<ApproveRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    match service.approve_work(&ProjectId(project_id), &actor, request.feedback) {
        Ok((project, submission)) => (
            StatusCode::OK,
            axum::Json(json!({
                "project": WorkspaceProjectView::from_record(&project),
                "submission": submission,
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn request_revision_handler<P, Y, G, L, N, F>(
    State(service): State<Arc<WorkSubmissionCoordinator<P, Y, G, L, N, F>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
    axum::Json(request): axum::Json<ReasonRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    match service.request_revision(&ProjectId(project_id), &actor, request.reason) {
        Ok(project) => (
            StatusCode::OK,
            axum::Json(WorkspaceProjectView::from_record(&project)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_handler<P, Y, G, L, N, F>(
    State(service): State<Arc<WorkSubmissionCoordinator<P, Y, G, L, N, F>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
    axum::Json(request): axum::Json<ReasonRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    match service.reject_work(&ProjectId(project_id), &actor, request.reason) {
        Ok(project) => (
            StatusCode::OK,
            axum::Json(WorkspaceProjectView::from_record(&project)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<P, Y, G, L, N, F>(
    State(service): State<Arc<WorkSubmissionCoordinator<P, Y, G, L, N, F>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    match service.submission_history(&ProjectId(project_id), &actor) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn current_handler<P, Y, G, L, N, F>(
    State(service): State<Arc<WorkSubmissionCoordinator<P, Y, G, L, N, F>>>,
    Path(project_id): Path<String>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    match service.current_submission(&ProjectId(project_id), &actor) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: SubmissionError) -> Response {
    let status = match &error {
        SubmissionError::ProjectNotFound => StatusCode::NOT_FOUND,
        SubmissionError::Forbidden => StatusCode::FORBIDDEN,
        SubmissionError::Conflict => StatusCode::CONFLICT,
        SubmissionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionError::Project(_) => StatusCode::BAD_REQUEST,
        SubmissionError::FileStore(_) => StatusCode::BAD_GATEWAY,
        SubmissionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
