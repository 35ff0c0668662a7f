//! Maintenance Scheduler - periodic and on-demand background maintenance
//!
//! Runs the built-in maintenance tasks on the dispatch clock and exposes the
//! administrative endpoints over HTTP.

use std::net::SocketAddr;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maintenance_scheduler::api::{create_router, AppState};
use maintenance_scheduler::tasks::register_builtin_tasks;
use maintenance_scheduler::{Config, MaintenanceScheduler};

/// Main entry point for the maintenance service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the scheduler and register the built-in tasks
/// 4. Start the supervised dispatch loop
/// 5. Serve the admin endpoints on the configured port
/// 6. On SIGINT/SIGTERM stop the scheduler and cancel outstanding work
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maintenance_scheduler=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting maintenance scheduler");

    let config = Config::from_env();
    info!(
        "Configuration loaded: enabled={}, interval={}s, max_concurrent_tasks={}, task_timeout={}s, port={}",
        config.scheduler.enabled,
        config.scheduler.maintenance_interval.as_secs(),
        config.scheduler.max_concurrent_tasks,
        config.scheduler.task_timeout.as_secs(),
        config.server_port
    );

    let scheduler = MaintenanceScheduler::new(config.scheduler.clone());
    let registered = register_builtin_tasks(&scheduler, &config).await;
    info!("Registered {} built-in maintenance task(s)", registered.len());

    let root = CancellationToken::new();
    scheduler.start(&root);

    let app = create_router(AppState::new(scheduler.clone(), root.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Admin endpoint listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    root.cancel();
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
