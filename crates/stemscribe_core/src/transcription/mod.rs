//! Speech-to-text engines.
//!
//! An engine wraps one loaded speech model. Engines are not assumed to be
//! reentrant: the pipeline only reaches them through a `SharedTranscriber`,
//! which serializes calls behind a mutex.

mod engine;
mod whisper_cli;
#[cfg(feature = "whisper-rs")]
mod whisper_rs;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::Settings;
use crate::models::TranscriptionBackend;
use crate::tools::{ToolError, ToolRunner};

pub use engine::{SharedTranscriber, TranscriptionEngine, TranscriptionRequest};
pub use whisper_cli::WhisperCliEngine;
#[cfg(feature = "whisper-rs")]
pub use whisper_rs::WhisperRsEngine;

/// Errors from a speech model.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Speech model not found at: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Failed to load speech model: {0}")]
    ModelLoadFailed(String),

    #[error("Audio decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Transcriber finished but wrote no transcript at {}", .0.display())]
    MissingTranscript(PathBuf),

    #[error("Unreadable transcript at {}: {source}", .path.display())]
    MalformedTranscript {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Transcription backend {0:?} is not available in this build")]
    BackendUnavailable(TranscriptionBackend),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TranscriptionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Tool(e) if e.is_timeout())
    }
}

/// Result type for transcription.
pub type TranscriptionResult<T> = Result<T, TranscriptionError>;

/// Build the configured engine once and wrap it for sharing.
///
/// For the in-process backend this loads the model; call it at startup,
/// not per job.
pub fn engine_from_settings(
    settings: &Settings,
    runner: &ToolRunner,
) -> TranscriptionResult<SharedTranscriber> {
    let t = &settings.transcription;
    match t.backend {
        TranscriptionBackend::WhisperCli => Ok(SharedTranscriber::new(WhisperCliEngine::new(
            &settings.tools.whisper,
            &t.model,
            t.temperature,
            runner.clone(),
        ))),
        #[cfg(feature = "whisper-rs")]
        TranscriptionBackend::WhisperRs => Ok(SharedTranscriber::new(WhisperRsEngine::load(
            &t.model_path,
            t.temperature,
        )?)),
        #[cfg(not(feature = "whisper-rs"))]
        TranscriptionBackend::WhisperRs => Err(TranscriptionError::BackendUnavailable(
            TranscriptionBackend::WhisperRs,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_cli() {
        let settings = Settings::default();
        let shared = engine_from_settings(&settings, &ToolRunner::default()).unwrap();
        assert_eq!(shared.engine_name(), "whisper-cli");
        assert!(!shared.requires_canonical_input());
    }

    #[cfg(not(feature = "whisper-rs"))]
    #[test]
    fn in_process_backend_needs_feature() {
        let mut settings = Settings::default();
        settings.transcription.backend = TranscriptionBackend::WhisperRs;
        let err = engine_from_settings(&settings, &ToolRunner::default()).unwrap_err();
        assert!(matches!(err, TranscriptionError::BackendUnavailable(_)));
    }
}
