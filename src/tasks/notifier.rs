//! Interval completion notifier background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::state::{AppState, TimerEvent, TimerMode};

/// Text shown to the user when an interval of `from` runs out
pub fn completion_notice(from: TimerMode, to: TimerMode, task_title: Option<&str>) -> String {
    match (from, task_title) {
        (TimerMode::Focus, Some(title)) => format!(
            "Focus session on \"{}\" complete. {} is ready when you are",
            title,
            to.label()
        ),
        (TimerMode::Focus, None) => format!("Focus session complete. {} is ready when you are", to.label()),
        (TimerMode::Break, _) => format!("Break is over. {} is ready when you are", to.label()),
    }
}

/// Background task that announces every interval completion
pub async fn notifier_task(state: Arc<AppState>) {
    info!("Starting notifier task");

    let mut events = state.subscribe_events();

    loop {
        match events.recv().await {
            Ok(TimerEvent::IntervalComplete { from, to, task, at }) => {
                let title = task.as_ref().map(|t| t.title.as_str());
                info!(at = %at, "{}", completion_notice(from, to, title));
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Notifier lagged, skipped {} notices", skipped);
            }
            Err(RecvError::Closed) => {
                error!("Timer event channel closed, stopping notifier");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_notice_names_task() {
        let notice = completion_notice(TimerMode::Focus, TimerMode::Break, Some("Write report"));
        assert!(notice.contains("on \"Write report\" complete"));
        assert!(notice.contains("Break Time"));
    }

    #[test]
    fn break_notice_points_back_to_focus() {
        let notice = completion_notice(TimerMode::Break, TimerMode::Focus, Some("ignored"));
        assert_eq!(notice, "Break is over. Focus Time is ready when you are");
    }
}
