//! Blocking runner for external tools.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::ToolSettings;

use super::slots::ToolSlots;
use super::types::{ToolError, ToolInvocation, ToolOutput, ToolResult};

/// How often a running tool is polled when a timeout is set.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs external tools with a shared concurrency cap and optional timeout.
///
/// Cheap to clone; clones share the same slot pool.
#[derive(Clone)]
pub struct ToolRunner {
    slots: ToolSlots,
    timeout: Option<Duration>,
}

impl ToolRunner {
    pub fn new(max_concurrent: usize, timeout: Option<Duration>) -> Self {
        Self {
            slots: ToolSlots::new(max_concurrent),
            timeout,
        }
    }

    pub fn from_settings(settings: &ToolSettings) -> Self {
        Self::new(settings.max_concurrent, settings.timeout())
    }

    pub fn slots(&self) -> &ToolSlots {
        &self.slots
    }

    /// Run the invocation to completion.
    ///
    /// Blocks until a slot is free, then until the tool exits or the time
    /// limit passes. A zero exit status is the only success.
    pub fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput> {
        let tool = invocation.tool().to_string();
        let _permit = self.slots.acquire();

        tracing::debug!("Running: {}", invocation.command_line());
        let started = Instant::now();

        let mut command = Command::new(invocation.program());
        command
            .args(invocation.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout also reaches workers the tool spawned.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = command
            .spawn()
            .map_err(|source| ToolError::SpawnFailed {
                tool: tool.clone(),
                source,
            })?;

        // Drain both pipes on their own threads so a chatty tool cannot
        // block on a full pipe while we wait on it.
        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        let status = match self.timeout {
            Some(limit) => wait_with_deadline(&mut child, limit),
            None => child.wait().map(Some),
        }
        .map_err(|source| ToolError::Io {
            tool: tool.clone(),
            source,
        })?;

        let elapsed = started.elapsed();

        // A killed tool's own children may still hold the pipes open, so
        // the reader threads are left detached instead of joined.
        let Some(status) = status else {
            tracing::warn!("{} killed after {:?}", tool, elapsed);
            return Err(ToolError::TimedOut {
                tool,
                after: self.timeout.unwrap_or(elapsed),
            });
        };

        let stdout = collect(stdout_reader);
        let stderr = collect(stderr_reader);

        if !status.success() {
            return Err(ToolError::NonZeroExit {
                tool,
                exit_code: status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        tracing::debug!("{} finished in {:.1}s", tool, elapsed.as_secs_f64());
        Ok(ToolOutput {
            stdout,
            stderr,
            elapsed,
        })
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::from_settings(&ToolSettings::default())
    }
}

/// Wait for the child, killing it once `limit` has passed.
///
/// Returns `Ok(None)` when the child was killed.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_group(child);
            // The process may exit between try_wait and kill.
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGKILL every process in the child's group.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let group = format!("-{}", child.id());
    let result = Command::new("kill")
        .args(["-KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = result {
        tracing::warn!("cannot signal process group {}: {}", group, e);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
