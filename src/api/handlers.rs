//! API Handlers
//!
//! HTTP request handlers for the maintenance admin endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{HealthResponse, RestartResponse, RunResponse, TasksResponse};
use crate::scheduler::MaintenanceScheduler;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Scheduler driven by the endpoints
    pub scheduler: MaintenanceScheduler,
    /// Root scope on-demand runs and restarts execute under
    pub root: CancellationToken,
}

impl AppState {
    /// Creates a new AppState around a scheduler and the service's root scope.
    pub fn new(scheduler: MaintenanceScheduler, root: CancellationToken) -> Self {
        Self { scheduler, root }
    }
}

/// Handler for GET /maintenance/tasks
pub async fn list_tasks_handler(State(state): State<AppState>) -> Json<TasksResponse> {
    Json(TasksResponse {
        running: state.scheduler.is_running(),
        tasks: state.scheduler.tasks().await,
    })
}

/// Handler for POST /maintenance/run
///
/// Runs every registered task now; fails with every failed task named.
pub async fn run_all_handler(State(state): State<AppState>) -> Result<Json<RunResponse>> {
    let succeeded = state.scheduler.run_all(&state.root).await?;
    Ok(Json(RunResponse::batch(succeeded)))
}

/// Handler for POST /maintenance/run/:name
pub async fn run_one_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RunResponse>> {
    state.scheduler.run_one(&state.root, &name).await?;
    Ok(Json(RunResponse::single(name)))
}

/// Handler for POST /maintenance/restart
pub async fn restart_handler(State(state): State<AppState>) -> Json<RestartResponse> {
    state.scheduler.restart(&state.root).await;
    let running = state.scheduler.is_running();
    let message = if running {
        "Maintenance scheduler restarted"
    } else {
        "Maintenance scheduler is disabled"
    };
    Json(RestartResponse {
        message: message.to_string(),
        running,
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::error::SchedulerError;
    use std::time::Duration;

    fn test_state() -> AppState {
        AppState::new(
            MaintenanceScheduler::new(SchedulerConfig::default()),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_run_all_handler() {
        let state = test_state();
        state
            .scheduler
            .register("compact", Duration::from_secs(60), |_| async { Ok(()) })
            .await;

        let response = run_all_handler(State(state)).await.unwrap();
        assert_eq!(response.succeeded, vec!["compact".to_string()]);
    }

    #[tokio::test]
    async fn test_run_one_handler_not_found() {
        let state = test_state();

        let result = run_one_handler(State(state), Path("missing".to_string())).await;
        assert!(matches!(result, Err(SchedulerError::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_tasks_handler() {
        let state = test_state();
        state
            .scheduler
            .register("backup", Duration::from_secs(60), |_| async { Ok(()) })
            .await;

        let response = list_tasks_handler(State(state)).await;
        assert!(!response.running);
        assert_eq!(response.tasks.len(), 1);
        assert_eq!(response.tasks[0].name, "backup");
    }

    #[tokio::test]
    async fn test_restart_handler_arms_loop() {
        let state = test_state();

        let response = restart_handler(State(state.clone())).await;
        assert!(response.running);
        state.scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
