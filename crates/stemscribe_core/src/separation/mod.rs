//! Vocal separation and stem relocation.
//!
//! The separation tool owns the shape of its output tree; `StemLayout` is
//! the only place that knows it, and `OutputLocator` is the only place that
//! reads from it.

mod demucs;
mod layout;
mod locator;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::conversion::ConversionError;
use crate::tools::ToolError;

pub use demucs::{DemucsSeparator, SeparationEngine};
pub use layout::{input_basename, StemLayout};
pub use locator::OutputLocator;

/// Errors from the separation tool.
#[derive(Error, Debug)]
pub enum SeparationError {
    #[error("Separation input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Lossy input must be converted to PCM before separation.
    #[error("Separation needs PCM input, got {}", .0.display())]
    NeedsPcmInput(PathBuf),

    #[error("Separation of {} failed: {source}", .input.display())]
    Tool {
        input: PathBuf,
        #[source]
        source: ToolError,
    },
}

impl SeparationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Tool { source, .. } if source.is_timeout())
    }

    pub fn tool_error(&self) -> Option<&ToolError> {
        match self {
            Self::Tool { source, .. } => Some(source),
            _ => None,
        }
    }

    pub(crate) fn tool(input: &Path, source: ToolError) -> Self {
        Self::Tool {
            input: input.to_path_buf(),
            source,
        }
    }
}

/// Result type for separation.
pub type SeparationResult<T> = Result<T, SeparationError>;

/// Errors while picking a stem out of the output tree.
#[derive(Error, Debug)]
pub enum LocateError {
    /// The tool exited 0 but the expected stem is absent.
    #[error("Expected separation output not found: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Post-separation re-encode failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Result type for the locator.
pub type LocateResult<T> = Result<T, LocateError>;
