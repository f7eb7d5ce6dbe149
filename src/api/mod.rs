//! HTTP API module
//!
//! This module contains the HTTP presentation surface: endpoint handlers and
//! response structures over the shared timer and task store.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints.
///
/// Opening the surface makes sure the clock driver is running; a driver that
/// is already running is reused.
pub fn create_router(state: Arc<AppState>) -> Router {
    state.start_clock();

    Router::new()
        .route("/timer", get(timer_handler))
        .route("/timer/start", post(start_handler))
        .route("/timer/pause", post(pause_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/timer/clear-task", post(clear_task_handler))
        .route("/timer/config", put(config_handler))
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/:id", put(update_task_handler).delete(delete_task_handler))
        .route("/tasks/:id/toggle", post(toggle_task_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
