//! Upload intake: validation and unique staging of input files.
//!
//! A staged file is named `<uuid>_<sanitized name>` in the upload folder.
//! The uuid token becomes the job id, so concurrent uploads of the same
//! file never share a path.

mod sanitize;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::config::{IntakeSettings, Settings};
use crate::models::{Job, JobId, Operation};

pub use sanitize::secure_filename;

/// Reasons an upload is rejected.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("File type not allowed: {0} (allowed: {1})")]
    UnsupportedExtension(String, String),

    #[error("File name is empty after sanitizing: {0:?}")]
    EmptyName(String),

    #[error("File is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("Failed to stage upload {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for intake.
pub type IntakeResult<T> = Result<T, IntakeError>;

/// A file saved under its unique staging name.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub path: PathBuf,
    pub token: Uuid,
    pub original_name: String,
}

impl StagedUpload {
    /// Build a job for this upload; its id is the staging token.
    pub fn into_job(self, operation: Operation) -> Job {
        Job::new(self.path, operation).with_id(JobId::from(self.token))
    }
}

/// Validates uploads and stages them in the upload folder.
#[derive(Debug, Clone)]
pub struct UploadIntake {
    upload_dir: PathBuf,
    allowed_extensions: Vec<String>,
    max_bytes: u64,
}

impl UploadIntake {
    pub fn new(upload_dir: impl Into<PathBuf>, settings: &IntakeSettings) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            allowed_extensions: settings
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_bytes: settings.max_upload_bytes,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.paths.upload_dir(), &settings.intake)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Whether `name` has an allowed extension (case-insensitive).
    pub fn allowed_file(&self, name: &str) -> bool {
        name.rsplit_once('.')
            .map(|(_, ext)| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|a| *a == ext)
            })
            .unwrap_or(false)
    }

    /// Copy `source` into the upload folder under a unique name.
    ///
    /// `original_name` is the client-supplied name; only its sanitized form
    /// reaches the filesystem.
    pub fn stage_file(&self, source: &Path, original_name: &str) -> IntakeResult<StagedUpload> {
        let size = fs::metadata(source)
            .map_err(|e| io_error(source, e))?
            .len();
        let (path, token, secure) = self.reserve(original_name, size)?;

        fs::copy(source, &path).map_err(|e| io_error(&path, e))?;
        tracing::info!("Staged {} as {}", secure, path.display());

        Ok(StagedUpload {
            path,
            token,
            original_name: original_name.to_string(),
        })
    }

    /// Write uploaded bytes into the upload folder under a unique name.
    pub fn stage_bytes(&self, bytes: &[u8], original_name: &str) -> IntakeResult<StagedUpload> {
        let (path, token, secure) = self.reserve(original_name, bytes.len() as u64)?;

        fs::write(&path, bytes).map_err(|e| io_error(&path, e))?;
        tracing::info!("Staged {} as {}", secure, path.display());

        Ok(StagedUpload {
            path,
            token,
            original_name: original_name.to_string(),
        })
    }

    /// Validate and pick the staging path.
    fn reserve(&self, original_name: &str, size: u64) -> IntakeResult<(PathBuf, Uuid, String)> {
        let secure = secure_filename(original_name);
        if secure.is_empty() {
            return Err(IntakeError::EmptyName(original_name.to_string()));
        }
        if !self.allowed_file(&secure) {
            return Err(IntakeError::UnsupportedExtension(
                secure,
                self.allowed_extensions.join(", "),
            ));
        }
        if size > self.max_bytes {
            return Err(IntakeError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        fs::create_dir_all(&self.upload_dir).map_err(|e| io_error(&self.upload_dir, e))?;
        let token = Uuid::new_v4();
        let path = self.upload_dir.join(format!("{}_{}", token, secure));
        Ok((path, token, secure))
    }
}

fn io_error(path: &Path, source: io::Error) -> IntakeError {
    IntakeError::Io {
        path: path.to_path_buf(),
        source,
    }
}
