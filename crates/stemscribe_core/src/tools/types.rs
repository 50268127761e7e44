//! Tool invocation and result types.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// One external process call: program plus fixed argument list.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Short tool name for errors and logs (e.g. "ffmpeg").
    tool: String,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Shell-like rendering for logs. Not meant to be re-parsed.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| {
            let s = a.to_string_lossy();
            if s.contains(' ') {
                format!("\"{}\"", s)
            } else {
                s.into_owned()
            }
        }));
        parts.join(" ")
    }
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Failure of an external tool call.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The program could not be started (not installed, not executable).
    #[error("Failed to start {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The program ran and exited non-zero.
    #[error("{tool} failed with exit code {exit_code}: {stderr}")]
    NonZeroExit {
        tool: String,
        exit_code: i32,
        stderr: String,
    },

    /// The program exceeded the time limit and was killed.
    #[error("{tool} timed out after {}s and was terminated", .after.as_secs())]
    TimedOut { tool: String, after: Duration },

    /// Waiting on or reading from the process failed.
    #[error("I/O error while running {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Standard error of the failed process, when there was one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Result type for tool calls.
pub type ToolResult<T> = Result<T, ToolError>;
