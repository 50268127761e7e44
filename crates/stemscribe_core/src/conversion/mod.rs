//! Format conversion via ffmpeg.
//!
//! Two target profiles:
//! - `SpeechCanonical`: mono, 16 kHz, 16-bit PCM WAV (what speech models want)
//! - `PcmWav`: 16-bit PCM WAV keeping the source rate and channels
//!   (what the separation model wants)

mod ffmpeg;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::tools::ToolError;

pub use ffmpeg::{converted_path, is_canonical_wav, is_lossy, FormatConverter};

/// Target format of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionProfile {
    SpeechCanonical,
    PcmWav,
}

/// Errors from the format converter.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Conversion input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// ffmpeg failed; the tool error carries its stderr.
    #[error("Conversion of {} failed: {source}", .input.display())]
    Tool {
        input: PathBuf,
        #[source]
        source: ToolError,
    },

    /// ffmpeg exited 0 but left no output file.
    #[error("ffmpeg reported success but {} was not written", .0.display())]
    MissingOutput(PathBuf),
}

impl ConversionError {
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

/// Result type for conversions.
pub type ConversionResult<T> = Result<T, ConversionError>;
