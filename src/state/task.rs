//! Task record structure

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Task priority bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Main,
    Secondary,
    Backlog,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Main => "main",
            Priority::Secondary => "secondary",
            Priority::Backlog => "backlog",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" => Ok(Priority::Main),
            "secondary" => Ok(Priority::Secondary),
            "backlog" => Ok(Priority::Backlog),
            other => Err(format!("Unknown priority: {}", other)),
        }
    }
}

/// A tracked task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub completed: bool,
}

impl Task {
    /// Create an open task with a fresh id
    pub fn new(title: impl Into<String>, description: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            priority,
            completed: false,
        }
    }

    /// Sample task shown when no tasks have been stored yet
    pub fn welcome() -> Self {
        Self {
            id: "1".to_string(),
            title: "Welcome to TaskFlow".to_string(),
            description: "This is a sample task to get you started. Add more tasks to fill your day."
                .to_string(),
            priority: Priority::Main,
            completed: false,
        }
    }
}
