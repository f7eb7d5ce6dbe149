//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod clock_driver;
pub mod notifier;

// Re-export main types and functions
pub use clock_driver::{clock_driver_task, ClockDriver, TICK_PERIOD};
pub use notifier::notifier_task;
