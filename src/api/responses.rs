//! API response and request structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{Priority, Remaining, Task, TimerConfig, TimerMode, TimerState};

/// Timer snapshot as rendered by presentation surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub mode: TimerMode,
    pub label: String,
    pub remaining: Remaining,
    /// `mm:ss` rendering of `remaining`
    pub display: String,
    pub running: bool,
    pub progress: f64,
    pub linked_task: Option<Task>,
    pub config: TimerConfig,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

impl TimerResponse {
    pub fn new(state: TimerState) -> Self {
        Self {
            mode: state.mode,
            label: state.mode.label().to_string(),
            remaining: state.remaining,
            display: state.remaining.to_string(),
            running: state.running,
            progress: state.progress,
            linked_task: state.linked_task,
            config: state.config,
            last_action: None,
            last_action_time: None,
        }
    }

    /// Attach last action tracking
    pub fn with_last_action(
        mut self,
        last_action: Option<String>,
        last_action_time: Option<DateTime<Utc>>,
    ) -> Self {
        self.last_action = last_action;
        self.last_action_time = last_action_time;
        self
    }
}

/// Error body returned alongside non-success status codes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Body of POST /timer/start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    pub task_id: String,
}

/// Body of POST /timer/reset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub task_id: Option<String>,
}

/// Body of PUT /timer/config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigRequest {
    #[serde(default)]
    pub focus_minutes: Option<u32>,
    #[serde(default)]
    pub break_minutes: Option<u32>,
}

/// Body of POST /tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    Priority::Main.to_string()
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
    pub clock_active: bool,
}

impl HealthResponse {
    pub fn ok(uptime: String, clock_active: bool) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime,
            clock_active,
        }
    }
}
