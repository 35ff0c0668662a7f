//! API Module
//!
//! HTTP handlers and routing for the maintenance admin endpoint.
//!
//! # Endpoints
//! - `GET /maintenance/tasks` - List registered tasks and their last run
//! - `POST /maintenance/run` - Run every task now
//! - `POST /maintenance/run/:name` - Run one task now
//! - `POST /maintenance/restart` - Restart the dispatch loop
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
