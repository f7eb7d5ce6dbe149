//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

use crate::state::{
    timer_state::{DEFAULT_BREAK_MINUTES, DEFAULT_FOCUS_MINUTES},
    TimerConfig,
};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "taskflow")]
#[command(about = "Personal task tracker with a shared background focus timer")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Focus interval length in minutes (5-60)
    #[arg(short, long = "focus", default_value_t = DEFAULT_FOCUS_MINUTES)]
    pub focus_minutes: u32,

    /// Break interval length in minutes (1-30)
    #[arg(short, long, default_value_t = DEFAULT_BREAK_MINUTES)]
    pub break_minutes: u32,

    /// JSON file to persist tasks in; tasks live in memory when omitted
    #[arg(long)]
    pub tasks_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Initial timer lengths, clamped into their allowed ranges
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig::new(self.focus_minutes, self.break_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["taskflow"]).unwrap();
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.timer_config(), TimerConfig::new(25, 5));
        assert_eq!(config.log_level(), "info");
        assert!(config.tasks_file.is_none());
    }

    #[test]
    fn timer_lengths_are_clamped() {
        let config =
            Config::try_parse_from(["taskflow", "--focus", "90", "--break-minutes", "0", "-v"]).unwrap();
        assert_eq!(config.timer_config(), TimerConfig::new(60, 1));
        assert_eq!(config.log_level(), "debug");
    }
}
