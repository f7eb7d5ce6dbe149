//! Main application state management

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::{
    CompletionHook, FocusTimer, Task, TaskStore, TaskStoreError, TickOutcome, TimerConfig,
    TimerMode, TimerState,
};
use crate::tasks::ClockDriver;

/// Notification published when an interval runs out
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    IntervalComplete {
        from: TimerMode,
        to: TimerMode,
        task: Option<Task>,
        at: DateTime<Utc>,
    },
}

/// Failure of a guarded session operation requested by a presentation surface
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Another task is currently in progress: \"{0}\"")]
    Busy(String),

    #[error(transparent)]
    Task(#[from] TaskStoreError),

    #[error("{0}")]
    State(String),
}

/// Shared application state injected into every presentation surface
#[derive(Debug)]
pub struct AppState {
    /// The one focus timer of the process
    pub timer: Arc<Mutex<FocusTimer>>,
    /// Task records the timer links to
    pub tasks: Arc<TaskStore>,
    /// Repeating one-second trigger that ticks the timer
    pub clock: ClockDriver,
    pub start_time: Instant,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Channel for timer updates
    pub timer_update_tx: watch::Sender<TimerState>,
    /// Keep the receiver alive to prevent channel closure
    pub _timer_update_rx: watch::Receiver<TimerState>,
    /// Channel for interval completion notices
    pub event_tx: broadcast::Sender<TimerEvent>,
    /// Task ids whose focus session completed, awaiting the store update
    pending_completions: Arc<Mutex<Vec<String>>>,
}

impl AppState {
    /// Create the application state and bind the task completion bridge
    pub fn new(config: TimerConfig, tasks: TaskStore) -> Self {
        let tasks = Arc::new(tasks);
        let mut timer = FocusTimer::new(config);

        // The hook runs under the timer lock; the store write happens once it is released
        let pending_completions = Arc::new(Mutex::new(Vec::new()));
        let pending = Arc::clone(&pending_completions);
        timer.subscribe_completion(Box::new(move |state| queue_linked_task(&pending, state)));

        let (timer_update_tx, timer_update_rx) = watch::channel(timer.state().clone());
        let (event_tx, _) = broadcast::channel(100);

        Self {
            timer: Arc::new(Mutex::new(timer)),
            tasks,
            clock: ClockDriver::new(),
            start_time: Instant::now(),
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            timer_update_tx,
            _timer_update_rx: timer_update_rx,
            event_tx,
            pending_completions,
        }
    }

    /// Apply an operation to the timer and notify timer state watchers
    pub fn update_timer<F, R>(&self, action: &str, op: F) -> Result<(R, TimerState), String>
    where
        F: FnOnce(&mut FocusTimer) -> R,
    {
        let mut timer = self.lock_timer()?;
        let result = op(&mut *timer);
        let new_state = self.commit(&timer, action);
        drop(timer); // Release the lock before touching the task store

        self.flush_completions();
        Ok((result, new_state))
    }

    /// Like `update_timer`, but refuses while another task's session runs.
    ///
    /// The check and the operation share one critical section.
    fn update_session<F, R>(
        &self,
        action: &str,
        task_id: &str,
        op: F,
    ) -> Result<(R, TimerState), SessionError>
    where
        F: FnOnce(&mut FocusTimer) -> R,
    {
        let mut timer = self.lock_timer().map_err(SessionError::State)?;
        check_session(timer.state(), task_id)?;
        let result = op(&mut *timer);
        let new_state = self.commit(&timer, action);
        drop(timer);

        self.flush_completions();
        Ok((result, new_state))
    }

    pub fn set_focus_minutes(&self, minutes: u32) -> Result<TimerState, String> {
        let (applied, state) = self.update_timer("set-focus", |timer| timer.set_focus_minutes(minutes))?;
        info!("Focus length set to {} minutes (requested {})", applied, minutes);
        Ok(state)
    }

    pub fn set_break_minutes(&self, minutes: u32) -> Result<TimerState, String> {
        let (applied, state) = self.update_timer("set-break", |timer| timer.set_break_minutes(minutes))?;
        info!("Break length set to {} minutes (requested {})", applied, minutes);
        Ok(state)
    }

    /// Start or resume the timer for `task`; never relinks an already linked timer
    pub fn start_timer(&self, task: &Task) -> Result<TimerState, String> {
        let (linked, state) = self.update_timer("start", |timer| timer.start(task))?;
        if !linked {
            debug!("Start for task {} kept the existing link", task.id);
        }
        Ok(state)
    }

    pub fn pause_timer(&self) -> Result<TimerState, String> {
        self.update_timer("pause", |timer| timer.pause()).map(|(_, state)| state)
    }

    pub fn reset_timer(&self) -> Result<TimerState, String> {
        self.update_timer("reset", |timer| timer.reset()).map(|(_, state)| state)
    }

    pub fn clear_task(&self) -> Result<TimerState, String> {
        self.update_timer("clear-task", |timer| timer.clear_task()).map(|(_, state)| state)
    }

    /// Start the timer for the stored task `task_id`, refusing while another task's session runs
    pub fn start_session(&self, task_id: &str) -> Result<TimerState, SessionError> {
        let task = self.tasks.get(task_id)?;
        let (linked, state) = self.update_session("start", task_id, |timer| timer.start(&task))?;
        if !linked {
            debug!("Start for task {} kept the existing link", task_id);
        }
        Ok(state)
    }

    /// Reset the timer on behalf of `task_id`, refusing while another task's session runs
    pub fn reset_session(&self, task_id: Option<&str>) -> Result<TimerState, SessionError> {
        match task_id {
            Some(task_id) => self
                .update_session("reset", task_id, |timer| timer.reset())
                .map(|(_, state)| state),
            None => self.reset_timer().map_err(SessionError::State),
        }
    }

    /// Advance the timer by one second, publishing the change and any completion
    pub fn tick(&self) -> Result<TickOutcome, String> {
        let mut timer = self.lock_timer()?;

        let outcome = timer.tick();
        if outcome == TickOutcome::Idle {
            return Ok(outcome);
        }
        let new_state = timer.state().clone();
        self.timer_update_tx.send_replace(new_state.clone());
        drop(timer);

        self.flush_completions();

        if let TickOutcome::IntervalComplete { from, to } = outcome {
            let event = TimerEvent::IntervalComplete {
                from,
                to,
                task: new_state.linked_task,
                at: Utc::now(),
            };
            if self.event_tx.send(event).is_err() {
                debug!("No listeners for interval completion");
            }
        }

        Ok(outcome)
    }

    /// Register an additional focus completion subscriber
    pub fn subscribe_completion(&self, hook: CompletionHook) -> Result<(), String> {
        self.lock_timer()?.subscribe_completion(hook);
        Ok(())
    }

    /// Get current timer state
    pub fn get_timer_state(&self) -> Result<TimerState, String> {
        self.lock_timer().map(|timer| timer.state().clone())
    }

    pub fn is_running(&self) -> Result<bool, String> {
        self.lock_timer().map(|timer| timer.is_running())
    }

    /// Watch every published timer state
    pub fn subscribe_timer(&self) -> watch::Receiver<TimerState> {
        self.timer_update_tx.subscribe()
    }

    /// Receive interval completion notices
    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the clock driver unless one is already running
    pub fn start_clock(self: &Arc<Self>) -> bool {
        self.clock.ensure_started(Arc::downgrade(self))
    }

    /// Replace any running clock driver with a fresh one
    pub fn restart_clock(self: &Arc<Self>) {
        self.clock.init(Arc::downgrade(self));
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    fn lock_timer(&self) -> Result<MutexGuard<'_, FocusTimer>, String> {
        self.timer.lock()
            .map_err(|e| format!("Failed to lock timer: {}", e))
    }

    /// Record `action` and publish the timer's state. Called with the timer lock held,
    /// so watchers see updates in the order they were applied.
    fn commit(&self, timer: &FocusTimer, action: &str) -> TimerState {
        let new_state = timer.state().clone();

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        self.timer_update_tx.send_replace(new_state.clone());
        new_state
    }

    /// Apply completions queued by the bridge hook; the timer lock must not be held
    fn flush_completions(&self) {
        let queued: Vec<String> = match self.pending_completions.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(e) => {
                warn!("Failed to lock pending completions: {}", e);
                return;
            }
        };
        for task_id in queued {
            complete_task_in_store(&self.tasks, &task_id);
        }
    }
}

fn check_session(state: &TimerState, task_id: &str) -> Result<(), SessionError> {
    match &state.linked_task {
        Some(linked) if state.running && linked.id != task_id => {
            warn!("Rejected request for task {} while {} is in progress", task_id, linked.id);
            Err(SessionError::Busy(linked.title.clone()))
        }
        _ => Ok(()),
    }
}

/// Completion hook: remember the linked task for the store update
fn queue_linked_task(pending: &Mutex<Vec<String>>, state: &TimerState) {
    let Some(linked) = &state.linked_task else {
        return;
    };
    match pending.lock() {
        Ok(mut pending) => pending.push(linked.id.clone()),
        Err(e) => warn!("Failed to queue completion of task {}: {}", linked.id, e),
    }
}

/// Mark the task complete in the store, keeping every other field
fn complete_task_in_store(store: &TaskStore, task_id: &str) {
    match store.get(task_id) {
        Ok(task) if task.completed => {
            debug!("Task {} already completed", task.id);
        }
        Ok(mut task) => {
            task.completed = true;
            match store.update_task(task) {
                Ok(task) => info!("Focus session complete, marked task {} ({}) done", task.id, task.title),
                Err(e) => warn!("Failed to complete task {}: {}", task_id, e),
            }
        }
        Err(e) => warn!("Linked task {} unavailable: {}", task_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Priority, Remaining};

    fn state_with(tasks: Vec<Task>) -> AppState {
        AppState::new(TimerConfig::default(), TaskStore::with_tasks(tasks))
    }

    fn task(id: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Title {}", id),
            description: format!("Description {}", id),
            priority: Priority::Secondary,
            completed,
        }
    }

    /// Run the current interval down to zero and return the transition outcome
    fn run_out(state: &AppState) -> TickOutcome {
        loop {
            match state.tick().unwrap() {
                TickOutcome::Advanced => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn focus_completion_marks_linked_task_done() {
        let state = state_with(vec![task("t1", false)]);
        state.start_timer(&task("t1", false)).unwrap();

        let outcome = run_out(&state);
        assert_eq!(
            outcome,
            TickOutcome::IntervalComplete { from: TimerMode::Focus, to: TimerMode::Break }
        );

        let stored = state.tasks.get("t1").unwrap();
        assert_eq!(stored, Task { completed: true, ..task("t1", false) });

        let timer = state.get_timer_state().unwrap();
        assert_eq!(timer.mode, TimerMode::Break);
        assert_eq!(timer.remaining, Remaining::new(5, 0));
        assert!(!timer.running);
    }

    #[test]
    fn bridge_sees_post_transition_state() {
        let state = state_with(vec![task("t1", false)]);
        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);
        state
            .subscribe_completion(Box::new(move |timer| {
                *sink.lock().unwrap() = Some((timer.mode, timer.remaining, timer.running));
            }))
            .unwrap();

        state.start_timer(&task("t1", false)).unwrap();
        run_out(&state);

        assert_eq!(
            *observed.lock().unwrap(),
            Some((TimerMode::Break, Remaining::new(5, 0), false))
        );
        // The task store bridge still ran
        assert!(state.tasks.get("t1").unwrap().completed);
    }

    #[test]
    fn break_completion_leaves_task_open() {
        let state = state_with(vec![task("t1", false)]);
        state.start_timer(&task("t1", false)).unwrap();
        run_out(&state);
        state.tasks.toggle("t1").unwrap(); // reopen

        state.start_timer(&task("t1", false)).unwrap();
        let outcome = run_out(&state);
        assert_eq!(
            outcome,
            TickOutcome::IntervalComplete { from: TimerMode::Break, to: TimerMode::Focus }
        );
        assert!(!state.tasks.get("t1").unwrap().completed);
    }

    #[test]
    fn completing_already_done_task_is_noop() {
        let state = state_with(vec![task("t1", true)]);
        state.start_timer(&task("t1", true)).unwrap();
        run_out(&state);
        assert_eq!(state.tasks.get("t1").unwrap(), task("t1", true));
    }

    #[test]
    fn completing_deleted_task_is_noop() {
        let state = state_with(vec![task("t1", false)]);
        state.start_timer(&task("t1", false)).unwrap();
        state.tasks.delete("t1").unwrap();
        run_out(&state);
        assert!(state.tasks.list().unwrap().is_empty());
    }

    #[test]
    fn interval_completion_is_broadcast() {
        let state = state_with(vec![task("t1", false)]);
        let mut events = state.subscribe_events();
        state.start_timer(&task("t1", false)).unwrap();
        run_out(&state);

        let TimerEvent::IntervalComplete { from, to, task, .. } = events.try_recv().unwrap();
        assert_eq!(from, TimerMode::Focus);
        assert_eq!(to, TimerMode::Break);
        assert_eq!(task.map(|t| t.id), Some("t1".to_string()));
    }

    #[test]
    fn session_start_rejects_other_task_while_running() {
        let state = state_with(vec![task("a", false), task("b", false)]);
        state.start_session("a").unwrap();

        let err = state.start_session("b").unwrap_err();
        assert!(matches!(err, SessionError::Busy(title) if title == "Title a"));
        let err = state.reset_session(Some("b")).unwrap_err();
        assert!(matches!(err, SessionError::Busy(_)));

        // Once paused, another task may resume it but the link stays
        state.pause_timer().unwrap();
        let timer = state.start_session("b").unwrap();
        assert!(timer.running);
        assert!(timer.is_linked_to("a"));
    }

    #[test]
    fn session_start_unknown_task() {
        let state = state_with(Vec::new());
        let err = state.start_session("missing").unwrap_err();
        assert!(matches!(err, SessionError::Task(TaskStoreError::NotFound(_))));
    }

    #[test]
    fn updates_are_published_and_recorded() {
        let state = state_with(Vec::new());
        let mut rx = state.subscribe_timer();
        state.set_focus_minutes(30).unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().remaining, Remaining::new(30, 0));
        assert_eq!(state.get_last_action().0.as_deref(), Some("set-focus"));
    }

    #[test]
    fn paused_tick_publishes_nothing() {
        let state = state_with(Vec::new());
        let rx = state.subscribe_timer();
        assert_eq!(state.tick().unwrap(), TickOutcome::Idle);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn store_update_runs_after_timer_lock_is_released() {
        let state = Arc::new(state_with(vec![task("t1", false)]));
        let seen_in_hook = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen_in_hook);
        let store = Arc::clone(&state.tasks);
        state
            .subscribe_completion(Box::new(move |_| {
                *sink.lock().unwrap() = Some(store.get("t1").unwrap().completed);
            }))
            .unwrap();

        state.start_timer(&task("t1", false)).unwrap();
        run_out(&state);

        // Inside the hook the store is untouched; the write lands before tick returns
        assert_eq!(*seen_in_hook.lock().unwrap(), Some(false));
        assert!(state.tasks.get("t1").unwrap().completed);
        assert!(state.timer.try_lock().is_ok());
    }

    #[test]
    fn file_backed_completion_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = TaskStore::open(&path).unwrap();
        let state = AppState::new(TimerConfig::new(5, 1), store);

        state.start_session("1").unwrap();
        run_out(&state);

        let saved: Vec<Task> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, vec![Task { completed: true, ..Task::welcome() }]);
    }

    #[test]
    fn watchers_end_on_latest_state_under_contention() {
        use std::sync::Barrier;
        use std::thread;

        let state = Arc::new(state_with(vec![task("t1", false)]));
        let rx = state.subscribe_timer();

        for _ in 0..2000 {
            state.start_timer(&task("t1", false)).unwrap();
            let barrier = Arc::new(Barrier::new(2));

            let ticker = {
                let (state, barrier) = (Arc::clone(&state), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    state.tick().unwrap();
                })
            };
            let pauser = {
                let (state, barrier) = (Arc::clone(&state), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    state.pause_timer().unwrap();
                })
            };
            ticker.join().unwrap();
            pauser.join().unwrap();

            assert_eq!(*rx.borrow(), state.get_timer_state().unwrap());
            state.reset_timer().unwrap();
        }
    }

    #[test]
    fn guarded_reset_never_rewinds_a_session_started_concurrently() {
        use std::sync::Barrier;
        use std::thread;

        let state = Arc::new(state_with(vec![task("a", false), task("b", false)]));
        state.start_session("a").unwrap();
        state.pause_timer().unwrap();

        for _ in 0..2000 {
            let barrier = Arc::new(Barrier::new(2));
            let starter = {
                let (state, barrier) = (Arc::clone(&state), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    state.start_session("a").unwrap();
                })
            };
            let resetter = {
                let (state, barrier) = (Arc::clone(&state), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    // Rejected when the start landed first
                    let _ = state.reset_session(Some("b"));
                })
            };
            starter.join().unwrap();
            resetter.join().unwrap();

            // Either the reset ran before the start, or it was refused
            assert!(state.get_timer_state().unwrap().running);
            state.pause_timer().unwrap();
        }
    }
}
