//! A logger scoped to one job.
//!
//! Everything is mirrored to `tracing` with the job id attached. With a log
//! folder, lines at or above the configured level also land in
//! `<logs>/<job_id>.log`. Tool stderr is held in a bounded tail so the last
//! lines can be replayed when a step fails.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, LogLevel, Marker};

struct Sinks {
    file: Option<BufWriter<File>>,
    tail: VecDeque<String>,
}

pub struct JobLogger {
    job_id: String,
    log_path: Option<PathBuf>,
    config: LogConfig,
    sinks: Mutex<Sinks>,
}

impl JobLogger {
    /// Logger backed by `<log_dir>/<job_id>.log`.
    pub fn new(
        job_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
    ) -> io::Result<Self> {
        let job_id = job_id.into();
        fs::create_dir_all(log_dir.as_ref())?;
        let path = log_dir.as_ref().join(format!("{}.log", file_stem_for(&job_id)));
        let file = File::create(&path)?;

        let mut logger = Self::detached(job_id, config);
        logger.sinks.get_mut().file = Some(BufWriter::new(file));
        logger.log_path = Some(path);
        Ok(logger)
    }

    /// Logger that only forwards to `tracing`.
    pub fn detached(job_id: impl Into<String>, config: LogConfig) -> Self {
        let sinks = Sinks {
            file: None,
            tail: VecDeque::with_capacity(config.error_tail),
        };
        Self {
            job_id: job_id.into(),
            log_path: None,
            config,
            sinks: Mutex::new(sinks),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let job = self.job_id.as_str();
        match level {
            LogLevel::Trace => tracing::trace!(job, "{message}"),
            LogLevel::Debug => tracing::debug!(job, "{message}"),
            LogLevel::Info => tracing::info!(job, "{message}"),
            LogLevel::Warn => tracing::warn!(job, "{message}"),
            LogLevel::Error => tracing::error!(job, "{message}"),
        }
        if level >= self.config.level {
            self.append(message);
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &Marker::Warning.apply(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &Marker::Failure.apply(message));
    }

    /// Command line of an external tool about to run.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &Marker::Command.apply(command));
    }

    pub fn stage(&self, stage_name: &str) {
        self.log(LogLevel::Info, &Marker::Stage.apply(stage_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &Marker::Done.apply(message));
    }

    pub fn cleanup(&self, message: &str) {
        self.log(LogLevel::Debug, &Marker::Cleanup.apply(message));
    }

    /// Keep non-blank lines of tool output in the tail.
    ///
    /// Outside compact mode each line is also written to the job file.
    pub fn tool_output(&self, output: &str) {
        let stamped: Vec<String> = if self.config.compact {
            Vec::new()
        } else {
            output
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| self.stamp(&Marker::Tool.apply(l)))
                .collect()
        };

        let mut sinks = self.sinks.lock();
        for line in output.lines().filter(|l| !l.trim().is_empty()) {
            if sinks.tail.len() == self.config.error_tail {
                sinks.tail.pop_front();
            }
            sinks.tail.push_back(line.to_owned());
        }
        if let Some(file) = sinks.file.as_mut() {
            for line in &stamped {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    /// Replay the tail under a `[<header>/tail]` line.
    pub fn show_tail(&self, header: &str) {
        let lines = self.tail();
        if lines.is_empty() {
            return;
        }
        self.append(&format!("[{header}/tail]"));
        for line in &lines {
            tracing::warn!(job = %self.job_id, "{line}");
            self.append(line);
        }
    }

    pub fn tail(&self) -> Vec<String> {
        self.sinks.lock().tail.iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(file) = self.sinks.lock().file.as_mut() {
            let _ = file.flush();
        }
    }

    /// Flush and drop the file handle. Later lines go to `tracing` only.
    pub fn close(&self) {
        if let Some(mut file) = self.sinks.lock().file.take() {
            let _ = file.flush();
        }
    }

    fn stamp(&self, message: &str) -> String {
        if self.config.show_timestamps {
            format!("[{}] {message}", Local::now().format("%H:%M:%S"))
        } else {
            message.to_owned()
        }
    }

    fn append(&self, message: &str) {
        let line = self.stamp(message);
        if let Some(file) = self.sinks.lock().file.as_mut() {
            let _ = writeln!(file, "{line}");
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

fn file_stem_for(job_id: &str) -> String {
    job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
