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
use crate::workflows::outbound::{Notifier, PaymentGateway};
use crate::workflows::projects::domain::{ProjectId, StudentId};
use crate::workflows::projects::repository::ProjectRepository;

use super::coordinator::{PaymentCoordinator, PaymentFlowError};
use super::domain::{PaymentId, ReleaseMethod};
use super::repository::{EarningsLedger, PaymentRepository};

/// Router builder exposing the escrow endpoints.
pub fn payment_router<P, Y, G, L, N>(service: Arc<PaymentCoordinator<P, Y, G, L, N>>) -> Router
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/payments/orders",
            post(create_order_handler::<P, Y, G, L, N>),
        )
        .route(
            "/api/v1/payments/verify",
            post(verify_handler::<P, Y, G, L, N>),
        )
        .route(
            "/api/v1/payments/bulk-release",
            post(bulk_release_handler::<P, Y, G, L, N>),
        )
        .route(
            "/api/v1/payments/pending-releases",
            get(pending_releases_handler::<P, Y, G, L, N>),
        )
        .route(
            "/api/v1/payments/revenue",
            get(revenue_handler::<P, Y, G, L, N>),
        )
        .route(
            "/api/v1/payments/:payment_id/release",
            post(release_handler::<P, Y, G, L, N>),
        )
        .route(
            "/api/v1/payments/:payment_id/refund",
            post(refund_handler::<P, Y, G, L, N>),
        )
        .route(
            "/api/v1/students/me/earnings",
            get(earnings_handler::<P, Y, G, L, N>),
        )
        .route(
            "/api/v1/companies/me/payments",
            get(company_payments_handler::<P, Y, G, L, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateOrderRequest {
    pub project_id: String,
    #[serde(default)]
    pub student_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyRequest {
    pub order_ref: String,
    pub payment_ref: String,
    pub signature: String,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct ReleaseRequest {
    #[serde(default)]
    pub method: Option<ReleaseMethod>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefundRequest {
    pub reason: String,
    #[serde(default)]
    pub amount: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkReleaseRequest {
    pub payment_ids: Vec<String>,
    #[serde(default)]
    pub method: Option<ReleaseMethod>,
}

pub(crate) async fn create_order_handler<P, Y, G, L, N>(
    State(service): State<Arc<PaymentCoordinator<P, Y, G, L, N>>>,
    actor: ActorContext,
    axum::Json(request): axum::Json<CreateOrderRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    let student_override = request.student_id.map(StudentId);
    match service.create_order(&ProjectId(request.project_id), &actor, student_override) {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn verify_handler<P, Y, G, L, N>(
    State(service): State<Arc<PaymentCoordinator<P, Y, G, L, N>>>,
    actor: ActorContext,
    axum::Json(request): axum::Json<VerifyRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    match service.verify_and_capture(
        &request.order_ref,
        &request.payment_ref,
        &request.signature,
        &actor,
    ) {
        Ok(payment) => (StatusCode::OK, axum::Json(payment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn release_handler<P, Y, G, L, N>(
    State(service): State<Arc<PaymentCoordinator<P, Y, G, L, N>>>,
    Path(payment_id): Path<String>,
    actor: ActorContext,
    axum::Json(request): axum::Json<ReleaseRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    let method = request.method.unwrap_or(ReleaseMethod::ManualTransfer);
    match service.release(&PaymentId(payment_id), &actor, method, request.notes) {
        Ok(payment) => (StatusCode::OK, axum::Json(payment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn refund_handler<P, Y, G, L, N>(
    State(service): State<Arc<PaymentCoordinator<P, Y, G, L, N>>>,
    Path(payment_id): Path<String>,
    actor: ActorContext,
    axum::Json(request): axum::Json<RefundRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    match service.refund(&PaymentId(payment_id), &actor, request.reason, request.amount) {
        Ok(payment) => (StatusCode::OK, axum::Json(payment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn bulk_release_handler<P, Y, G, L, N>(
    State(service): State<Arc<PaymentCoordinator<P, Y, G, L, N>>>,
    actor: ActorContext,
    axum::Json(request): axum::Json<BulkReleaseRequest>,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    let ids: Vec<PaymentId> = request.payment_ids.into_iter().map(PaymentId).collect();
    let method = request.method.unwrap_or(ReleaseMethod::ManualTransfer);
    match service.bulk_release(&ids, &actor, method) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn pending_releases_handler<P, Y, G, L, N>(
    State(service): State<Arc<PaymentCoordinator<P, Y, G, L, N>>>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    match service.pending_releases(&actor) {
        Ok(payments) => (StatusCode::OK, axum::Json(payments)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn revenue_handler<P, Y, G, L, N>(
    State(service): State<Arc<PaymentCoordinator<P, Y, G, L, N>>>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    match service.platform_revenue(&actor) {
        Ok(total) => (
            StatusCode::OK,
            axum::Json(json!({ "platform_revenue": total })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn earnings_handler<P, Y, G, L, N>(
    State(service): State<Arc<PaymentCoordinator<P, Y, G, L, N>>>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    match service.student_earnings(&actor) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn company_payments_handler<P, Y, G, L, N>(
    State(service): State<Arc<PaymentCoordinator<P, Y, G, L, N>>>,
    actor: ActorContext,
) -> Response
where
    P: ProjectRepository + 'static,
    Y: PaymentRepository + 'static,
    G: PaymentGateway + 'static,
    L: EarningsLedger + 'static,
    N: Notifier + 'static,
{
    match service.company_payments(&actor) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: PaymentFlowError) -> Response {
    let status = match &error {
        PaymentFlowError::ProjectNotFound | PaymentFlowError::PaymentNotFound => {
            StatusCode::NOT_FOUND
        }
        PaymentFlowError::Forbidden => StatusCode::FORBIDDEN,
        PaymentFlowError::PaymentExists | PaymentFlowError::Conflict => StatusCode::CONFLICT,
        PaymentFlowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PaymentFlowError::InvalidSignature
        | PaymentFlowError::Payment(_)
        | PaymentFlowError::Project(_) => StatusCode::BAD_REQUEST,
        PaymentFlowError::Gateway(_) => StatusCode::BAD_GATEWAY,
        PaymentFlowError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
