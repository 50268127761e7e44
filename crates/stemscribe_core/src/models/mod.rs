//! Data types shared across the pipeline.
//!
//! - `Job` is the request: which file, which operation, which language.
//! - `JobStatus` is where a running job currently is.
//! - `JobOutput` is what a finished job hands back.

mod enums;
mod job;

pub use enums::{ErrorKind, JobStatus, Operation, Stem, StemFormat, TranscriptionBackend};
pub use job::{Job, JobId, JobOutput};
