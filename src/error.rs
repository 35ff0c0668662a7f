//! Error types for the maintenance scheduler
//!
//! Provides unified error handling using thiserror.

use std::fmt;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Task Error Enum ==
/// Outcome of a single task invocation that did not succeed.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The operation returned an error
    #[error("task '{task}' failed: {source:#}")]
    Failed {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// The operation panicked; trapped at the task boundary
    #[error("task '{task}' panicked: {message}")]
    Panicked { task: String, message: String },

    /// The operation did not return before its deadline
    #[error("task '{task}' timed out after {timeout:?}")]
    TimedOut { task: String, timeout: Duration },
}

impl TaskError {
    /// Name of the task this error belongs to.
    pub fn task(&self) -> &str {
        match self {
            TaskError::Failed { task, .. }
            | TaskError::Panicked { task, .. }
            | TaskError::TimedOut { task, .. } => task,
        }
    }
}

// == Batch Error ==
/// Aggregate of every task failure in one batch.
#[derive(Debug)]
pub struct BatchError {
    pub failures: Vec<TaskError>,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} maintenance task(s) failed", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

// == Scheduler Error Enum ==
/// Errors surfaced by the administrative API.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// No registered task carries the requested name
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// A single task invocation failed
    #[error(transparent)]
    Task(#[from] TaskError),

    /// One or more tasks of a batch failed
    #[error(transparent)]
    Batch(#[from] BatchError),
}

// == IntoResponse Implementation ==
impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = match &self {
            SchedulerError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::Task(TaskError::TimedOut { .. }) => StatusCode::GATEWAY_TIMEOUT,
            SchedulerError::Task(_) | SchedulerError::Batch(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the scheduler.
pub type Result<T> = std::result::Result<T, SchedulerError>;
