use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use campuslance::workflows::outbound::{FileStore, Notifier, PaymentGateway};
use campuslance::workflows::payments::{
    payment_router, EarningsLedger, PaymentCoordinator, PaymentRepository,
};
use campuslance::workflows::projects::applications::{
    application_router, ApplicationRepository, SelectionCoordinator,
};
use campuslance::workflows::projects::submissions::{workspace_router, WorkSubmissionCoordinator};
use campuslance::workflows::projects::{project_router, ProjectCatalog, ProjectRepository};
use serde_json::json;
use std::sync::Arc;

/// One router covering the whole marketplace surface: the project board,
/// application selection, the delivery workspace, and the escrow endpoints,
/// plus the operational probes.
pub(crate) fn marketplace_routes<P, A, Y, G, L, N, F>(
    catalog: Arc<ProjectCatalog<P>>,
    selection: Arc<SelectionCoordinator<P, A, N>>,
    workspace: Arc<WorkSubmissionCoordinator<P, Y, G, L, N, F>>,
    payments: Arc<PaymentCoordinator<P, Y, G, L, N>>,
) -> axum::Router
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
    F: FileStore + 'static,
{
    project_router(catalog)
        .merge(application_router(selection))
        .merge(workspace_router(workspace))
        .merge(payment_router(payments))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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
