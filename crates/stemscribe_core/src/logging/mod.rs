//! Process-wide `tracing` setup and per-job log files.
//!
//! The binary installs one subscriber at startup (stderr, plus a daily
//! `stemscribe.log` when a log folder is available). Each job then gets a
//! [`JobLogger`] whose lines carry the job id and whose tail of tool stderr
//! is replayed when a step fails.
//!
//! ```no_run
//! use stemscribe_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("3f1c", "logs", LogConfig::default())?;
//! logger.stage("Convert");
//! logger.command("ffmpeg -y -i input.mp3 input.wav");
//! logger.success("Job 3f1c done");
//! # Ok::<(), std::io::Error>(())
//! ```

mod job_logger;
mod types;

use std::path::Path;

pub use job_logger::JobLogger;
pub use types::{LogConfig, LogLevel, Marker};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber (stderr only).
///
/// `RUST_LOG` overrides `default_level`. Should be called once at startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(env_filter(default_level))
        .init();
}

/// Initialize the global tracing subscriber with stderr plus a daily
/// rolling file `stemscribe.log` in `logs_dir`.
///
/// The returned guard must be held for the life of the process; dropping
/// it stops the background writer.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(logs_dir) {
        eprintln!(
            "Warning: cannot create log folder {}: {}",
            logs_dir.display(),
            e
        );
        init_tracing(default_level);
        return None;
    }

    let appender = tracing_appender::rolling::daily(logs_dir, "stemscribe.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(env_filter(default_level))
        .init();

    Some(guard)
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()))
}
