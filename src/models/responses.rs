//! Response DTOs for the maintenance admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::scheduler::TaskInfo;

/// Response body for GET /maintenance/tasks
#[derive(Debug, Clone, Serialize)]
pub struct TasksResponse {
    /// Whether a dispatch loop is armed
    pub running: bool,
    /// Registered tasks in registration order
    pub tasks: Vec<TaskInfo>,
}

/// Response body for POST /maintenance/run and POST /maintenance/run/:name
#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    /// Success message
    pub message: String,
    /// Tasks that completed without error
    pub succeeded: Vec<String>,
}

impl RunResponse {
    /// Creates a response for a run-all batch
    pub fn batch(succeeded: Vec<String>) -> Self {
        Self {
            message: format!("{} maintenance task(s) completed", succeeded.len()),
            succeeded,
        }
    }

    /// Creates a response for a single on-demand run
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            message: format!("Task '{}' completed successfully", name),
            succeeded: vec![name],
        }
    }
}

/// Response body for POST /maintenance/restart
#[derive(Debug, Clone, Serialize)]
pub struct RestartResponse {
    pub message: String,
    pub running: bool,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
