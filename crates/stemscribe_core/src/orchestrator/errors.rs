//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Job → Step → Stage error → Tool error

use std::path::PathBuf;

use thiserror::Error;

use crate::conversion::ConversionError;
use crate::models::ErrorKind;
use crate::separation::{LocateError, SeparationError};
use crate::tools::ToolError;
use crate::transcription::TranscriptionError;

/// Top-level pipeline error with job context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Job '{job_id}' failed at step '{step_name}': {source}")]
    StepFailed {
        job_id: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The job could not be set up (input missing, directories).
    #[error("Job '{job_id}' setup failed: {message}")]
    SetupFailed { job_id: String, message: String },
}

impl PipelineError {
    pub fn step_failed(
        job_id: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            job_id: job_id.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn setup_failed(job_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_id: job_id.into(),
            message: message.into(),
        }
    }

    /// Failure category for the boundary layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StepFailed { source, .. } => source.kind(),
            Self::SetupFailed { .. } => ErrorKind::Setup,
        }
    }

    /// Short human-readable description, without the job id.
    pub fn detail(&self) -> String {
        match self {
            Self::StepFailed { source, .. } => source.to_string(),
            Self::SetupFailed { message, .. } => message.clone(),
        }
    }

    pub fn job_id(&self) -> &str {
        match self {
            Self::StepFailed { job_id, .. } | Self::SetupFailed { job_id, .. } => job_id,
        }
    }
}

/// Error from a pipeline step.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Separation(#[from] SeparationError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    /// A step's precondition was not met.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// A step finished but its product is absent.
    #[error("{producer} reported success but {} does not exist", .path.display())]
    MissingOutput { path: PathBuf, producer: String },
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn missing_output(path: impl Into<PathBuf>, producer: impl Into<String>) -> Self {
        Self::MissingOutput {
            path: path.into(),
            producer: producer.into(),
        }
    }

    /// Failure category. Timeouts win over the stage they happened in.
    pub fn kind(&self) -> ErrorKind {
        if self.tool_error().is_some_and(ToolError::is_timeout) {
            return ErrorKind::Timeout;
        }
        match self {
            Self::Conversion(ConversionError::MissingOutput(_)) => ErrorKind::MissingOutput,
            Self::Conversion(_) => ErrorKind::Conversion,
            Self::Transcription(_) => ErrorKind::Transcription,
            Self::Separation(_) => ErrorKind::Separation,
            Self::Locate(LocateError::MissingOutput(_)) => ErrorKind::MissingOutput,
            Self::Locate(LocateError::Conversion(ConversionError::MissingOutput(_))) => {
                ErrorKind::MissingOutput
            }
            Self::Locate(LocateError::Conversion(_)) => ErrorKind::Conversion,
            Self::Locate(LocateError::Move { .. }) => ErrorKind::Separation,
            Self::MissingOutput { .. } => ErrorKind::MissingOutput,
            Self::InvalidInput(_) => ErrorKind::Setup,
        }
    }

    /// The external tool failure underneath, if any.
    pub fn tool_error(&self) -> Option<&ToolError> {
        match self {
            Self::Conversion(e) | Self::Locate(LocateError::Conversion(e)) => e.tool_error(),
            Self::Transcription(TranscriptionError::Tool(e)) => Some(e),
            Self::Separation(e) => e.tool_error(),
            _ => None,
        }
    }

    /// Standard error of the failed tool, if any.
    pub fn tool_stderr(&self) -> Option<&str> {
        self.tool_error().and_then(ToolError::stderr)
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
