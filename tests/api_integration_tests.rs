//! Integration Tests for the Admin Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use maintenance_scheduler::{api::create_router, AppState, MaintenanceScheduler, SchedulerConfig};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

// == Helper Functions ==

async fn create_test_app() -> (Router, MaintenanceScheduler) {
    let scheduler = MaintenanceScheduler::new(SchedulerConfig::default());
    scheduler
        .register("prune-sessions", Duration::from_secs(3600), |_| async { Ok(()) })
        .await;
    scheduler
        .register("rotate-backups", Duration::from_secs(3600), |_| async {
            Err(anyhow::anyhow!("backup target unreachable"))
        })
        .await;
    let app = create_router(AppState::new(scheduler.clone(), CancellationToken::new()));
    (app, scheduler)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Tasks Endpoint Tests ==

#[tokio::test]
async fn test_list_tasks() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/maintenance/tasks")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["running"], Value::Bool(false));
    let tasks = json["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["name"], "prune-sessions");
    assert_eq!(tasks[0]["interval_secs"], 3600);
    assert_eq!(tasks[0]["due"], Value::Bool(true));
}

// == Run Endpoint Tests ==

#[tokio::test]
async fn test_run_one_success() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(post("/maintenance/run/prune-sessions"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("prune-sessions"));
}

#[tokio::test]
async fn test_run_one_failure_names_cause() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(post("/maintenance/run/rotate-backups"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(response.into_body()).await;
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("rotate-backups"));
    assert!(error.contains("backup target unreachable"));
}

#[tokio::test]
async fn test_run_one_unknown_task() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(post("/maintenance/run/nonexistent"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "task not found: nonexistent");
}

#[tokio::test]
async fn test_run_all_reports_failed_task() {
    let (app, scheduler) = create_test_app().await;

    let response = app.oneshot(post("/maintenance/run")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(response.into_body()).await;
    let error = json["error"].as_str().unwrap();
    assert!(error.starts_with("1 maintenance task(s) failed"));
    assert!(error.contains("rotate-backups"));

    let tasks = scheduler.tasks().await;
    assert!(!tasks[0].due);
    assert!(tasks[1].due);
}

// == Restart Endpoint Tests ==

#[tokio::test]
async fn test_restart_endpoint() {
    let (app, scheduler) = create_test_app().await;

    let response = app.oneshot(post("/maintenance/restart")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["running"], Value::Bool(true));
    assert!(scheduler.is_running());
    scheduler.stop().await;
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}
