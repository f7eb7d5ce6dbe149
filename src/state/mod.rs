//! State management module
//!
//! This module contains the shared focus timer, the task records it is attributed to,
//! and the application state that hands both to every presentation surface.

pub mod app_state;
pub mod focus_timer;
pub mod task;
pub mod task_store;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, TimerEvent};
pub use focus_timer::{CompletionHook, FocusTimer, TickOutcome};
pub use task::{Priority, Task};
pub use task_store::{TaskStore, TaskStoreError};
pub use timer_state::{Remaining, TimerConfig, TimerMode, TimerState};
