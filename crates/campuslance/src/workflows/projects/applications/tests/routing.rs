use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::identity::{ActorContext, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use crate::workflows::projects::applications::router::{reject_handler, RejectRequest};
use crate::workflows::projects::domain::StudentId;

fn apply_payload() -> serde_json::Value {
    json!({
        "cover_letter": application_draft().cover_letter,
        "proposed_price": 800,
        "estimated_time": "three_to_four_weeks",
        "snapshot": {
            "name": "Asha",
            "college": "State Engineering College",
            "city": "Pune",
            "skills": ["rust"],
        }
    })
}

#[tokio::test]
async fn apply_route_creates_application() {
    let (coordinator, projects, _, _) = build_coordinator();
    let project = seed_project(&projects);
    let router = router_with(coordinator);

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/projects/{}/applications", project.id.0))
                .header(header::CONTENT_TYPE, "application/json")
                .header(ACTOR_ID_HEADER, "stu-1")
                .header(ACTOR_ROLE_HEADER, "student")
                .body(Body::from(apply_payload().to_string()))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("pending")));
    assert!(payload.get("application_id").is_some());
}

#[tokio::test]
async fn apply_route_rejects_missing_identity_headers() {
    let (coordinator, projects, _, _) = build_coordinator();
    let project = seed_project(&projects);
    let router = router_with(coordinator);

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/projects/{}/applications", project.id.0))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(apply_payload().to_string()))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn apply_route_returns_conflict_for_duplicate() {
    let (coordinator, projects, _, _) = build_coordinator();
    let project = seed_project(&projects);
    coordinator
        .apply(
            StudentId("stu-1".to_string()),
            &project.id,
            application_draft(),
            snapshot("Asha"),
        )
        .expect("first apply");
    let router = router_with(coordinator);

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/projects/{}/applications", project.id.0))
                .header(header::CONTENT_TYPE, "application/json")
                .header(ACTOR_ID_HEADER, "stu-1")
                .header(ACTOR_ROLE_HEADER, "student")
                .body(Body::from(apply_payload().to_string()))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn approve_route_assigns_project() {
    let (coordinator, projects, _, _) = build_coordinator();
    let project = seed_project(&projects);
    let application = coordinator
        .apply(
            StudentId("stu-1".to_string()),
            &project.id,
            application_draft(),
            snapshot("Asha"),
        )
        .expect("apply");
    let router = router_with(coordinator);

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/applications/{}/approve", application.id.0))
                .header(ACTOR_ID_HEADER, "co-1")
                .header(ACTOR_ROLE_HEADER, "company")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("status"), Some(&json!("accepted")));
}

#[tokio::test]
async fn approve_route_returns_not_found_for_unknown_application() {
    let (coordinator, _, _, _) = build_coordinator();
    let router = router_with(coordinator);

    let response = router
        .oneshot(
            Request::post("/api/v1/applications/app-999999/approve")
                .header(ACTOR_ID_HEADER, "co-1")
                .header(ACTOR_ROLE_HEADER, "company")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reject_handler_maps_short_reason_to_unprocessable() {
    let (coordinator, projects, _, _) = build_coordinator();
    let project = seed_project(&projects);
    let application = coordinator
        .apply(
            StudentId("stu-1".to_string()),
            &project.id,
            application_draft(),
            snapshot("Asha"),
        )
        .expect("apply");

    let response = reject_handler::<MemoryProjects, MemoryApplications, MemoryNotifier>(
        State(Arc::new(coordinator)),
        Path(application.id.0.clone()),
        ActorContext::company("co-1"),
        axum::Json(RejectRequest {
            reason: "nope".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn decision_routes_are_forbidden_for_non_owners() {
    let (coordinator, projects, _, _) = build_coordinator();
    let project = seed_project(&projects);
    let application = coordinator
        .apply(
            StudentId("stu-1".to_string()),
            &project.id,
            application_draft(),
            snapshot("Asha"),
        )
        .expect("apply");
    let router = router_with(coordinator);

    let response = router
        .oneshot(
            Request::post(format!(
                "/api/v1/applications/{}/shortlist",
                application.id.0
            ))
            .header(ACTOR_ID_HEADER, "co-2")
            .header(ACTOR_ROLE_HEADER, "company")
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stats_route_reports_student_counts() {
    let (coordinator, projects, _, _) = build_coordinator();
    let project = seed_project(&projects);
    coordinator
        .apply(
            StudentId("stu-1".to_string()),
            &project.id,
            application_draft(),
            snapshot("Asha"),
        )
        .expect("apply");
    let router = router_with(coordinator);

    let response = router
        .oneshot(
            Request::get("/api/v1/students/me/applications/stats")
                .header(ACTOR_ID_HEADER, "stu-1")
                .header(ACTOR_ROLE_HEADER, "student")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("total"), Some(&json!(1)));
    assert_eq!(payload.get("pending"), Some(&json!(1)));
}
