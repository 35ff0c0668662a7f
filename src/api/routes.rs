//! API Routes
//!
//! Configures the Axum router with the maintenance admin endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, list_tasks_handler, restart_handler, run_all_handler, run_one_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /maintenance/tasks` - List registered tasks
/// - `POST /maintenance/run` - Run every task now
/// - `POST /maintenance/run/:name` - Run one task now
/// - `POST /maintenance/restart` - Restart the dispatch loop
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/maintenance/tasks", get(list_tasks_handler))
        .route("/maintenance/run", post(run_all_handler))
        .route("/maintenance/run/:name", post(run_one_handler))
        .route("/maintenance/restart", post(restart_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
