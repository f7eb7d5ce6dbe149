//! Timer state structures: mode, countdown remainder, and tunable config

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Task;

/// Allowed range for focus interval length, in minutes
pub const FOCUS_MINUTES_RANGE: (u32, u32) = (5, 60);
/// Allowed range for break interval length, in minutes
pub const BREAK_MINUTES_RANGE: (u32, u32) = (1, 30);

pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// Kind of interval the timer is counting down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Focus,
    Break,
}

impl TimerMode {
    /// The mode entered when an interval of this mode completes
    pub fn opposite(self) -> Self {
        match self {
            TimerMode::Focus => TimerMode::Break,
            TimerMode::Break => TimerMode::Focus,
        }
    }

    /// Human-readable label shown by presentation surfaces
    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus Time",
            TimerMode::Break => "Break Time",
        }
    }
}

/// Countdown remainder as minutes and seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Remaining {
    pub minutes: u32,
    pub seconds: u32,
}

impl Remaining {
    pub fn new(minutes: u32, seconds: u32) -> Self {
        Self { minutes, seconds }
    }

    /// A full interval of `minutes`, i.e. `minutes:00`
    pub fn full(minutes: u32) -> Self {
        Self::new(minutes, 0)
    }

    pub fn total_seconds(&self) -> u32 {
        self.minutes * 60 + self.seconds
    }

    pub fn is_zero(&self) -> bool {
        self.minutes == 0 && self.seconds == 0
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

/// User-tunable interval lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub focus_minutes: u32,
    pub break_minutes: u32,
}

impl TimerConfig {
    /// Build a config, clamping both values into their allowed ranges
    pub fn new(focus_minutes: u32, break_minutes: u32) -> Self {
        Self {
            focus_minutes: clamp_focus_minutes(focus_minutes),
            break_minutes: clamp_break_minutes(break_minutes),
        }
    }

    /// Configured interval length for `mode`, in minutes
    pub fn minutes_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.focus_minutes,
            TimerMode::Break => self.break_minutes,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FOCUS_MINUTES, DEFAULT_BREAK_MINUTES)
    }
}

pub fn clamp_focus_minutes(minutes: u32) -> u32 {
    minutes.clamp(FOCUS_MINUTES_RANGE.0, FOCUS_MINUTES_RANGE.1)
}

pub fn clamp_break_minutes(minutes: u32) -> u32 {
    minutes.clamp(BREAK_MINUTES_RANGE.0, BREAK_MINUTES_RANGE.1)
}

/// Progress of an interval, inverted: 100 when just started, 0 when about to expire
pub fn progress_for(remaining: Remaining, interval_minutes: u32) -> f64 {
    let total = interval_minutes * 60;
    if total == 0 {
        return 0.0;
    }
    (100.0 * remaining.total_seconds() as f64 / total as f64).min(100.0)
}

/// Shared countdown state read by every presentation surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: TimerMode,
    pub remaining: Remaining,
    pub running: bool,
    pub progress: f64,
    /// Task this session is attributed to; the task store owns the record
    pub linked_task: Option<Task>,
    pub config: TimerConfig,
}

impl TimerState {
    /// Create a paused focus state at the start of a full interval
    pub fn new(config: TimerConfig) -> Self {
        Self {
            mode: TimerMode::Focus,
            remaining: Remaining::full(config.focus_minutes),
            running: false,
            progress: 100.0,
            linked_task: None,
            config,
        }
    }

    /// Configured length of the current mode, in minutes
    pub fn interval_minutes(&self) -> u32 {
        self.config.minutes_for(self.mode)
    }

    /// Recompute progress from `remaining` and the current mode's length
    pub fn expected_progress(&self) -> f64 {
        progress_for(self.remaining, self.interval_minutes())
    }

    /// Check whether the timer is currently attributed to the task with `task_id`
    pub fn is_linked_to(&self, task_id: &str) -> bool {
        self.linked_task.as_ref().is_some_and(|task| task.id == task_id)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}
