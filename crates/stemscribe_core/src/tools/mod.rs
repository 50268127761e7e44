//! External tool execution.
//!
//! Every external program (ffmpeg, demucs, whisper) is started through a
//! shared `ToolRunner`, which:
//! - caps how many tools run at once across all jobs (`ToolSlots`)
//! - captures stdout/stderr
//! - kills a tool that exceeds the configured time limit
//! - turns a non-zero exit into a `ToolError` carrying stderr

mod runner;
mod slots;
mod types;

pub use runner::ToolRunner;
pub use slots::{SlotPermit, ToolSlots};
pub use types::{ToolError, ToolInvocation, ToolOutput, ToolResult};
