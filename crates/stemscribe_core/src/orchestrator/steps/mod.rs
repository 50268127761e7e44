//! Pipeline step implementations.
//!
//! Each step handles one stage of a job.

mod convert;
mod locate;
mod separate;
mod transcribe;

pub use convert::ConvertStep;
pub use locate::LocateStep;
pub use separate::SeparateStep;
pub use transcribe::TranscribeStep;
