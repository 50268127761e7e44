//! Levels, per-job logger options, and line markers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

/// Ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `EnvFilter`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

/// Options for one [`JobLogger`](super::JobLogger).
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Lines below this level stay out of the job file.
    pub level: LogLevel,
    /// When set, tool output only reaches the tail, not the job file.
    pub compact: bool,
    /// Tool output lines retained for failure reports.
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig::from(&LoggingSettings::default())
    }
}

impl From<&LoggingSettings> for LogConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            compact: settings.compact,
            error_tail: usize::try_from(settings.error_tail.max(1)).unwrap_or(1),
            show_timestamps: settings.show_timestamps,
        }
    }
}

/// Decoration put in front of a job log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `$ ffmpeg ...`
    Command,
    /// `=== Separate ===`
    Stage,
    Done,
    Warning,
    Failure,
    Cleanup,
    /// Captured stderr of an external tool.
    Tool,
}

impl Marker {
    pub fn apply(self, text: &str) -> String {
        match self {
            Marker::Command => format!("$ {text}"),
            Marker::Stage => format!("=== {text} ==="),
            Marker::Done => format!("[done] {text}"),
            Marker::Warning => format!("[warn] {text}"),
            Marker::Failure => format!("[fail] {text}"),
            Marker::Cleanup => format!("[cleanup] {text}"),
            Marker::Tool => format!("[tool] {text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_decorate_text() {
        assert_eq!(Marker::Stage.apply("Convert"), "=== Convert ===");
        assert_eq!(Marker::Command.apply("ffmpeg -y"), "$ ffmpeg -y");
        assert_eq!(Marker::Cleanup.apply("x"), "[cleanup] x");
        assert_eq!(Marker::Tool.apply("Killed"), "[tool] Killed");
    }

    #[test]
    fn zero_tail_is_clamped_to_one() {
        let settings = LoggingSettings {
            error_tail: 0,
            ..LoggingSettings::default()
        };
        assert_eq!(LogConfig::from(&settings).error_tail, 1);
    }

    #[test]
    fn level_displays_as_filter() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }
}
