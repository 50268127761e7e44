//! Job request and result types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Operation;

/// Unique job identifier.
///
/// Taken from the unique token the upload was staged under, so the job's
/// log file, scratch directory and staged input all share one name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// A fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Derive the id from a staged file name of the form `<uuid>_<name>`.
    ///
    /// Falls back to a fresh id when the name carries no token.
    pub fn from_staged_path(path: &Path) -> Self {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.split_once('_'))
            .and_then(|(token, _)| Uuid::parse_str(token).ok())
            .map(|token| Self(token.to_string()))
            .unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Uuid> for JobId {
    fn from(token: Uuid) -> Self {
        Self(token.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One request to process a single audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    input_path: PathBuf,
    operation: Operation,
    language_hint: Option<String>,
}

impl Job {
    /// Create a job for an already staged input file.
    pub fn new(input_path: impl Into<PathBuf>, operation: Operation) -> Self {
        let input_path = input_path.into();
        Self {
            id: JobId::from_staged_path(&input_path),
            input_path,
            operation,
            language_hint: None,
        }
    }

    /// Set the language hint (ignored for separation).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        let trimmed = language.trim();
        self.language_hint = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Override the job id.
    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn language_hint(&self) -> Option<&str> {
        self.language_hint.as_deref()
    }

    /// Language to pass to the speech model.
    pub fn language_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.language_hint().unwrap_or(default)
    }
}

/// What a successfully finished job hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutput {
    /// Recognized text. May be empty for silent input.
    Transcript(String),
    /// Final stem file. Not removed at job teardown.
    Stem {
        path: PathBuf,
        /// File name relative to the processed folder, for building URLs.
        public_name: String,
    },
}

impl JobOutput {
    pub fn transcript(&self) -> Option<&str> {
        match self {
            Self::Transcript(text) => Some(text),
            Self::Stem { .. } => None,
        }
    }

    pub fn stem_path(&self) -> Option<&Path> {
        match self {
            Self::Stem { path, .. } => Some(path),
            Self::Transcript(_) => None,
        }
    }
}
