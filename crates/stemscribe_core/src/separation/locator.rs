//! Moves a stem out of the separation tree to a flat location.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::conversion::{ConversionProfile, FormatConverter};
use crate::models::{Stem, StemFormat};

use super::layout::StemLayout;
use super::{LocateError, LocateResult};

/// Finds the requested stem in the tool's tree and relocates it.
///
/// With a post-converter set, a relocated non-WAV stem is re-encoded to
/// PCM WAV by `finalize`.
#[derive(Clone, Default)]
pub struct OutputLocator {
    post_converter: Option<FormatConverter>,
}

impl OutputLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-encode relocated stems to WAV with `converter`.
    pub fn with_post_converter(mut self, converter: FormatConverter) -> Self {
        self.post_converter = Some(converter);
        self
    }

    /// Whether `finalize` will replace a stem in `format` with a new file.
    pub fn converts(&self, format: StemFormat) -> bool {
        self.post_converter.is_some() && format != StemFormat::Wav
    }

    /// Move `<root>/<model>/<basename>/<stem>.<ext>` to
    /// `<destination>/<basename>_<stem>.<ext>` and return the new path.
    ///
    /// Fails with `MissingOutput` when the expected file is absent, even if
    /// other files exist in the tree.
    pub fn locate_and_move(
        &self,
        layout: &StemLayout,
        basename: &str,
        stem: Stem,
        destination: &Path,
    ) -> LocateResult<PathBuf> {
        let expected = layout.stem_path(basename, stem);
        if !expected.is_file() {
            tracing::warn!(
                "Separation output missing at {} (model {})",
                expected.display(),
                layout.model()
            );
            return Err(LocateError::MissingOutput(expected));
        }

        let target = destination.join(layout.flat_name(basename, stem));
        move_file(&expected, &target).map_err(|source| LocateError::Move {
            from: expected.clone(),
            to: target.clone(),
            source,
        })?;

        tracing::info!("Moved {} to {}", expected.display(), target.display());
        Ok(target)
    }

    /// Apply the post-separation policy to a relocated stem.
    ///
    /// Returns the final path. When a conversion runs, the relocated file is
    /// left in place for the caller to remove.
    pub fn finalize(&self, relocated: &Path, format: StemFormat) -> LocateResult<PathBuf> {
        match &self.post_converter {
            Some(converter) if self.converts(format) => {
                Ok(converter.convert(relocated, ConversionProfile::PcmWav)?)
            }
            _ => Ok(relocated.to_path_buf()),
        }
    }
}

/// Rename, falling back to copy and remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!("rename failed ({}), copying instead", e);
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
