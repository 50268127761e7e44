//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// What a job was asked to do with its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Speech-to-text; result is plain text.
    #[serde(rename = "transcribe")]
    Transcribe,
    /// Remove vocals; result is the instrumental stem file.
    #[serde(rename = "separate")]
    SeparateVocals,
}

impl Operation {
    /// Short name used in log file names and messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::SeparateVocals => "separate",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One isolated component produced by a two-stem separation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stem {
    /// The isolated vocal track.
    Vocals,
    /// Everything except the vocals (instrumental).
    #[default]
    NoVocals,
}

impl Stem {
    /// File stem the separation tool uses for this component.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Vocals => "vocals",
            Self::NoVocals => "no_vocals",
        }
    }
}

impl std::fmt::Display for Stem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// Encoding the separation tool writes its stems in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemFormat {
    #[default]
    Mp3,
    Wav,
}

impl StemFormat {
    /// File extension (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

/// Which speech model implementation backs the transcription engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionBackend {
    /// Shell out to the `whisper` command-line tool.
    #[default]
    WhisperCli,
    /// In-process ggml model via whisper-rs (requires the `whisper-rs` feature).
    WhisperRs,
}

/// Category of a job failure.
///
/// This is what a boundary layer maps to its own status codes; the
/// human-readable detail travels alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The transcoding tool failed.
    Conversion,
    /// The speech model failed to decode or infer.
    Transcription,
    /// The separation tool exited non-zero.
    Separation,
    /// A tool reported success but its expected artifact is absent.
    MissingOutput,
    /// An external tool exceeded the configured time limit.
    Timeout,
    /// The input was rejected before any stage ran.
    Intake,
    /// The job could not be set up (directories, input file).
    Setup,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Conversion => "conversion",
            Self::Transcription => "transcription",
            Self::Separation => "separation",
            Self::MissingOutput => "missing_output",
            Self::Timeout => "timeout",
            Self::Intake => "intake",
            Self::Setup => "setup",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a job is in its lifecycle.
///
/// `Created → Converting? → Processing → Locating? → Done`, with any
/// state able to move to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Created,
    Converting,
    Processing,
    Locating,
    Done,
    Failed(ErrorKind),
}

impl JobStatus {
    /// `Done` and `Failed` are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Converting => write!(f, "converting"),
            Self::Processing => write!(f, "processing"),
            Self::Locating => write!(f, "locating"),
            Self::Done => write!(f, "done"),
            Self::Failed(kind) => write!(f, "failed ({})", kind),
        }
    }
}
