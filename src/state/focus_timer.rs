//! Focus timer state machine
//!
//! States are `{Focus, Break} x {running, paused}`. The machine never advances on
//! its own: the clock driver calls [`FocusTimer::tick`] once per second while the
//! timer is running. Every interval boundary flips the mode and pauses the timer,
//! so the next interval only starts on an explicit [`FocusTimer::start`].

use std::fmt;

use tracing::{debug, info};

use super::{
    timer_state::{clamp_break_minutes, clamp_focus_minutes},
    Remaining, Task, TimerConfig, TimerMode, TimerState,
};

/// Subscriber invoked after a focus interval completes.
///
/// Receives the post-transition state, so `mode` is already `Break`.
pub type CompletionHook = Box<dyn Fn(&TimerState) + Send + Sync>;

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer was paused; nothing changed
    Idle,
    /// Countdown moved one second closer to zero
    Advanced,
    /// Interval expired and the mode flipped
    IntervalComplete { from: TimerMode, to: TimerMode },
}

/// The single shared focus timer
pub struct FocusTimer {
    state: TimerState,
    completion_hooks: Vec<CompletionHook>,
}

impl FocusTimer {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            state: TimerState::new(config),
            completion_hooks: Vec::new(),
        }
    }

    /// Read access to the current state
    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Register a subscriber run on every focus completion, after earlier subscribers
    pub fn subscribe_completion(&mut self, hook: CompletionHook) {
        self.completion_hooks.push(hook);
        debug!("Completion subscribers: {}", self.completion_hooks.len());
    }

    /// Set the focus length (clamped to 5..=60) and return the applied value.
    ///
    /// A paused focus interval is resized to the new length; a running one is left alone.
    pub fn set_focus_minutes(&mut self, minutes: u32) -> u32 {
        let minutes = clamp_focus_minutes(minutes);
        self.state.config.focus_minutes = minutes;
        self.resize_rest_state(TimerMode::Focus);
        minutes
    }

    /// Set the break length (clamped to 1..=30) and return the applied value.
    ///
    /// A paused break interval is resized to the new length; a running one is left alone.
    pub fn set_break_minutes(&mut self, minutes: u32) -> u32 {
        let minutes = clamp_break_minutes(minutes);
        self.state.config.break_minutes = minutes;
        self.resize_rest_state(TimerMode::Break);
        minutes
    }

    fn resize_rest_state(&mut self, mode: TimerMode) {
        if !self.state.running && self.state.mode == mode {
            self.state.remaining = Remaining::full(self.state.config.minutes_for(mode));
            self.state.progress = 100.0;
        }
    }

    /// Start or resume the countdown.
    ///
    /// Links `task` only when no task is linked yet; an attempt to relink is ignored
    /// but the timer still runs. Returns whether `task` is the linked task afterwards.
    pub fn start(&mut self, task: &Task) -> bool {
        match &self.state.linked_task {
            None => {
                info!("Linking timer to task {} ({})", task.id, task.title);
                self.state.linked_task = Some(task.clone());
            }
            Some(linked) if linked.id != task.id => {
                debug!(
                    "Timer already linked to task {}, ignoring relink to {}",
                    linked.id, task.id
                );
            }
            Some(_) => {}
        }

        if !self.state.running {
            info!("{} started at {}", self.state.mode.label(), self.state.remaining);
            self.state.running = true;
        }

        self.state.is_linked_to(&task.id)
    }

    pub fn pause(&mut self) {
        if self.state.running {
            info!("{} paused at {}", self.state.mode.label(), self.state.remaining);
        }
        self.state.running = false;
    }

    /// Stop and rewind the current mode to its full length, keeping the linked task
    pub fn reset(&mut self) {
        self.state.running = false;
        self.state.remaining = Remaining::full(self.state.interval_minutes());
        self.state.progress = 100.0;
        info!("{} reset to {}", self.state.mode.label(), self.state.remaining);
    }

    /// Detach the linked task, leaving the countdown untouched
    pub fn clear_task(&mut self) -> Option<Task> {
        let cleared = self.state.linked_task.take();
        if let Some(task) = &cleared {
            info!("Unlinked task {} from timer", task.id);
        }
        cleared
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.running {
            return TickOutcome::Idle;
        }

        let remaining = &mut self.state.remaining;
        if remaining.seconds > 0 {
            remaining.seconds -= 1;
        } else if remaining.minutes > 0 {
            remaining.minutes -= 1;
            remaining.seconds = 59;
        } else {
            return self.complete_interval();
        }

        self.state.progress = self.state.expected_progress();
        TickOutcome::Advanced
    }

    fn complete_interval(&mut self) -> TickOutcome {
        let from = self.state.mode;
        let to = from.opposite();

        self.state.mode = to;
        self.state.remaining = Remaining::full(self.state.config.minutes_for(to));
        self.state.running = false;
        self.state.progress = 100.0;
        info!("{} complete, switched to {}", from.label(), to.label());

        // Subscribers observe the flipped state
        if from == TimerMode::Focus {
            self.complete_task();
        }

        TickOutcome::IntervalComplete { from, to }
    }

    /// Run every completion subscriber; a no-op when no task is linked
    pub fn complete_task(&self) {
        if self.state.linked_task.is_none() {
            debug!("Focus completed with no linked task");
            return;
        }
        for hook in &self.completion_hooks {
            hook(&self.state);
        }
    }
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl fmt::Debug for FocusTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusTimer")
            .field("state", &self.state)
            .field("completion_hooks", &self.completion_hooks.len())
            .finish()
    }
}
