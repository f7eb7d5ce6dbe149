//! Clock driver background task
//!
//! One repeating trigger per process advances the shared focus timer. The
//! trigger keeps firing while the timer is paused, so a later start is picked
//! up within one period.

use std::{
    sync::{Mutex, MutexGuard, Weak},
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::state::{AppState, TickOutcome};

/// Period between clock ticks
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Owner of the single clock driver task
#[derive(Debug)]
pub struct ClockDriver {
    period: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ClockDriver {
    pub fn new() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            handle: Mutex::new(None),
        }
    }

    /// Cancel any running driver and spawn a new one
    pub fn init(&self, state: Weak<AppState>) {
        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.abort();
            info!("Cancelled previous clock driver");
        }
        *slot = Some(tokio::spawn(clock_driver_task(state, self.period)));
    }

    /// Spawn a driver only if none is alive. Returns whether a driver was spawned.
    pub fn ensure_started(&self, state: Weak<AppState>) -> bool {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Clock driver already running");
            return false;
        }
        *slot = Some(tokio::spawn(clock_driver_task(state, self.period)));
        true
    }

    pub fn is_active(&self) -> bool {
        self.slot().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the running driver, if any
    pub fn shutdown(&self) {
        if let Some(handle) = self.slot().take() {
            handle.abort();
            info!("Clock driver stopped");
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        // The slot holds a plain handle; a poisoned lock leaves it usable
        self.handle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ClockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.slot().take() {
            handle.abort();
        }
    }
}

/// Background task that ticks the focus timer once per period while it runs
pub async fn clock_driver_task(state: Weak<AppState>, period: Duration) {
    info!("Starting clock driver ({}ms period)", period.as_millis());

    let mut interval = interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        let Some(state) = state.upgrade() else {
            info!("Application state dropped, stopping clock driver");
            break;
        };

        match state.is_running() {
            Ok(true) => match state.tick() {
                Ok(TickOutcome::IntervalComplete { from, to }) => {
                    debug!("Clock driver observed {:?} -> {:?}", from, to);
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to tick timer: {}", e),
            },
            Ok(false) => {
                // Timer paused, keep the beat
            }
            Err(e) => warn!("Failed to read timer state: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::sleep;

    use crate::state::{Remaining, Task, TaskStore, TimerConfig, TimerMode};

    fn app_state() -> Arc<AppState> {
        Arc::new(AppState::new(TimerConfig::default(), TaskStore::in_memory()))
    }

    fn remaining(state: &AppState) -> Remaining {
        state.get_timer_state().unwrap().remaining
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_running_timer_once_per_second() {
        let state = app_state();
        assert!(state.start_clock());
        state.start_timer(&Task::welcome()).unwrap();

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(remaining(&state), Remaining::new(24, 57));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_timer_is_left_alone() {
        let state = app_state();
        state.start_clock();

        sleep(Duration::from_millis(5500)).await;
        assert_eq!(remaining(&state), Remaining::new(25, 0));
        assert!(state.clock.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_picked_up_within_one_period() {
        let state = app_state();
        state.start_clock();

        sleep(Duration::from_millis(2500)).await;
        state.start_timer(&Task::welcome()).unwrap();
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(remaining(&state), Remaining::new(24, 59));
    }

    #[tokio::test(start_paused = true)]
    async fn second_surface_does_not_double_the_beat() {
        let state = app_state();
        assert!(state.start_clock());
        assert!(!state.start_clock());
        state.start_timer(&Task::welcome()).unwrap();

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(remaining(&state), Remaining::new(24, 57));
    }

    #[tokio::test(start_paused = true)]
    async fn reinit_replaces_previous_driver() {
        let state = app_state();
        state.restart_clock();
        state.restart_clock();
        state.restart_clock();
        state.start_timer(&Task::welcome()).unwrap();

        sleep(Duration::from_millis(4500)).await;
        assert_eq!(remaining(&state), Remaining::new(24, 56));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_ticking() {
        let state = app_state();
        state.start_clock();
        state.start_timer(&Task::welcome()).unwrap();

        sleep(Duration::from_millis(1500)).await;
        state.clock.shutdown();
        sleep(Duration::from_millis(3000)).await;

        assert_eq!(remaining(&state), Remaining::new(24, 59));
        assert!(!state.clock.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn driver_stops_itself_at_interval_boundary() {
        let state = app_state();
        state.set_focus_minutes(5).unwrap();
        state.start_clock();
        state.start_timer(&Task::welcome()).unwrap();

        // 300 decrements plus the transition tick, then idle periods
        sleep(Duration::from_millis(310_500)).await;

        let timer = state.get_timer_state().unwrap();
        assert_eq!(timer.mode, TimerMode::Break);
        assert!(!timer.running);
        assert_eq!(timer.remaining, Remaining::new(5, 0));
        assert!(state.tasks.get("1").unwrap().completed);
    }
}
