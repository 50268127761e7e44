//! Path builder for the separation tool's output tree.
//!
//! demucs writes `<root>/<model>/<input basename>/<stem>.<ext>`. That shape
//! belongs to the tool and has changed between releases, so nothing else in
//! the crate builds these paths by hand.

use std::path::{Path, PathBuf};

use crate::models::{Stem, StemFormat};

/// Naming convention of one separation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemLayout {
    root: PathBuf,
    model: String,
    format: StemFormat,
}

impl StemLayout {
    pub fn new(root: impl Into<PathBuf>, model: impl Into<String>, format: StemFormat) -> Self {
        Self {
            root: root.into(),
            model: model.into(),
            format,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn format(&self) -> StemFormat {
        self.format
    }

    /// `<root>/<model>`. Shared by every job using this model.
    pub fn model_dir(&self) -> PathBuf {
        self.root.join(&self.model)
    }

    /// `<root>/<model>/<basename>`. Owned by the one input it was made for.
    pub fn job_dir(&self, basename: &str) -> PathBuf {
        self.model_dir().join(basename)
    }

    /// `<root>/<model>/<basename>/<stem>.<ext>`.
    pub fn stem_path(&self, basename: &str, stem: Stem) -> PathBuf {
        self.job_dir(basename)
            .join(format!("{}.{}", stem.file_stem(), self.format.extension()))
    }

    /// Flat file name a relocated stem gets: `<basename>_<stem>.<ext>`.
    pub fn flat_name(&self, basename: &str, stem: Stem) -> String {
        format!(
            "{}_{}.{}",
            basename,
            stem.file_stem(),
            self.format.extension()
        )
    }
}

/// File name without its extension, as the tool uses it for the job dir.
pub fn input_basename(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
