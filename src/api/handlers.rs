//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::state::{app_state::SessionError, AppState, Priority, Task, TaskStoreError, TimerState};
use super::responses::{
    ConfigRequest, ErrorResponse, HealthResponse, NewTaskRequest, ResetRequest, StartRequest,
    TimerResponse,
};

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(message.into())))
}

fn internal(e: String) -> ApiError {
    error!("Internal error: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
}

fn store_error(e: TaskStoreError) -> ApiError {
    match e {
        TaskStoreError::NotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        other => internal(other.to_string()),
    }
}

fn session_error(e: SessionError) -> ApiError {
    match e {
        SessionError::Busy(_) => api_error(StatusCode::CONFLICT, e.to_string()),
        SessionError::Task(e) => store_error(e),
        SessionError::State(e) => internal(e),
    }
}

fn timer_response(state: &AppState, timer: TimerState) -> Json<TimerResponse> {
    let (last_action, last_action_time) = state.get_last_action();
    Json(TimerResponse::new(timer).with_last_action(last_action, last_action_time))
}

/// Handle GET /timer - Return the shared timer state
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerResponse> {
    let timer = state.get_timer_state().map_err(internal)?;
    Ok(timer_response(&state, timer))
}

/// Handle POST /timer/start - Start or resume the timer for a task
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> ApiResult<TimerResponse> {
    let timer = state.start_session(&request.task_id).map_err(session_error)?;
    info!("Start endpoint called for task {}", request.task_id);
    Ok(timer_response(&state, timer))
}

/// Handle POST /timer/pause - Pause the countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerResponse> {
    let timer = state.pause_timer().map_err(internal)?;
    Ok(timer_response(&state, timer))
}

/// Handle POST /timer/reset - Rewind the current interval
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Query(request): Query<ResetRequest>,
) -> ApiResult<TimerResponse> {
    let timer = state
        .reset_session(request.task_id.as_deref())
        .map_err(session_error)?;
    Ok(timer_response(&state, timer))
}

/// Handle POST /timer/clear-task - Detach the linked task
pub async fn clear_task_handler(State(state): State<Arc<AppState>>) -> ApiResult<TimerResponse> {
    let timer = state.clear_task().map_err(internal)?;
    Ok(timer_response(&state, timer))
}

/// Handle PUT /timer/config - Change interval lengths
pub async fn config_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfigRequest>,
) -> ApiResult<TimerResponse> {
    if let Some(minutes) = request.focus_minutes {
        state.set_focus_minutes(minutes).map_err(internal)?;
    }
    if let Some(minutes) = request.break_minutes {
        state.set_break_minutes(minutes).map_err(internal)?;
    }
    let timer = state.get_timer_state().map_err(internal)?;
    Ok(timer_response(&state, timer))
}

/// Handle GET /tasks - List every task
pub async fn list_tasks_handler(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Task>> {
    state.tasks.list().map(Json).map_err(store_error)
}

/// Handle POST /tasks - Create a task
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewTaskRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let priority: Priority = request.priority.parse().map_err(|e: String| {
        warn!("Rejected task: {}", e);
        api_error(StatusCode::UNPROCESSABLE_ENTITY, e)
    })?;

    let task = state
        .tasks
        .add(Task::new(request.title, request.description, priority))
        .map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Handle PUT /tasks/:id - Replace a task
pub async fn update_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(mut task): Json<Task>,
) -> ApiResult<Task> {
    task.id = id;
    state.tasks.update_task(task).map(Json).map_err(store_error)
}

/// Handle POST /tasks/:id/toggle - Flip a task's completed flag
pub async fn toggle_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Task> {
    state.tasks.toggle(&id).map(Json).map_err(store_error)
}

/// Handle DELETE /tasks/:id - Remove a task
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Task> {
    state.tasks.delete(&id).map(Json).map_err(store_error)
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.get_uptime(), state.clock.is_active()))
}
