//! Audio jobs on top of ffmpeg, demucs and whisper.
//!
//! A job is one staged file plus an [`models::Operation`]. The
//! [`orchestrator::Orchestrator`] converts the file when the next tool needs
//! it, runs vocal separation or speech-to-text, and hands back either the
//! transcript or the relocated stem. Every file a tool writes along the way
//! is tracked and removed when the job finishes, failed or not.
//!
//! Nothing here knows about HTTP. The `stemscribe` binary is one caller; an
//! upload endpoint would use [`intake::UploadIntake`] the same way.

pub mod config;
pub mod conversion;
pub mod intake;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod separation;
pub mod tools;
pub mod transcription;

#[cfg(test)]
pub(crate) mod test_support;
