//! TaskFlow - a personal task tracker with a shared background focus timer
//!
//! The core is one process-wide focus timer: a Pomodoro-style state machine
//! ticked by a single clock driver, observed by any number of presentation
//! surfaces, and marking its linked task complete when a focus interval ends.

pub mod config;
pub mod state;
pub mod api;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::{AppState, FocusTimer, Task, TaskStore, TimerState};
pub use api::create_router;
pub use utils::signals::shutdown_signal;
