//! TaskFlow - a personal task tracker with a shared background focus timer
//!
//! This is the main entry point for the taskflow server.

use std::sync::Arc;
use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use taskflow::{
    api::create_router,
    config::Config,
    state::{AppState, TaskStore},
    tasks::notifier_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("taskflow={},tower_http=info", config.log_level()))
        .init();

    let timer_config = config.timer_config();
    info!("Starting taskflow server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, focus={}min, break={}min",
          config.host, config.port, timer_config.focus_minutes, timer_config.break_minutes);

    let tasks = match &config.tasks_file {
        Some(path) => TaskStore::open(path)
            .with_context(|| format!("Failed to open task file {}", path.display()))?,
        None => {
            info!("No task file given, tasks are kept in memory");
            TaskStore::in_memory()
        }
    };

    // Create application state; the timer lives as long as the process
    let state = Arc::new(AppState::new(timer_config, tasks));

    // Announce interval completions
    let notifier_state = Arc::clone(&state);
    tokio::spawn(async move {
        notifier_task(notifier_state).await;
    });

    // Create HTTP router with all endpoints; this also starts the clock driver
    let app = create_router(Arc::clone(&state));

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timer             - Current timer state");
    info!("  POST   /timer/start       - Start the timer for a task");
    info!("  POST   /timer/pause       - Pause the timer");
    info!("  POST   /timer/reset       - Reset the current interval");
    info!("  POST   /timer/clear-task  - Detach the linked task");
    info!("  PUT    /timer/config      - Change focus/break lengths");
    info!("  GET    /tasks             - List tasks");
    info!("  POST   /tasks             - Add a task");
    info!("  PUT    /tasks/:id         - Update a task");
    info!("  POST   /tasks/:id/toggle  - Toggle task completion");
    info!("  DELETE /tasks/:id         - Delete a task");
    info!("  GET    /health            - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.clock.shutdown();
    info!("Server shutdown complete");
    Ok(())
}
