//! demucs command wrapper.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::conversion::is_lossy;
use crate::models::StemFormat;
use crate::tools::{ToolInvocation, ToolRunner};

use super::layout::StemLayout;
use super::{SeparationError, SeparationResult};

/// A two-stem vocal separator.
pub trait SeparationEngine: Send + Sync {
    /// Model variant; names the first level of the output tree.
    fn model(&self) -> &str;

    /// Encoding of the stems the engine writes.
    fn output_format(&self) -> StemFormat;

    /// Layout of the tree `separate` writes under `output_dir`.
    fn layout(&self, output_dir: &Path) -> StemLayout {
        StemLayout::new(output_dir, self.model(), self.output_format())
    }

    /// Separate `input` into stems under `output_dir`.
    ///
    /// Returns the root of the nested output tree. A successful return says
    /// nothing about which files exist; check with the locator.
    fn separate(&self, input: &Path, output_dir: &Path) -> SeparationResult<PathBuf>;
}

/// Runs `demucs --two-stems=vocals`.
#[derive(Clone)]
pub struct DemucsSeparator {
    program: PathBuf,
    model: String,
    format: StemFormat,
    runner: ToolRunner,
}

impl DemucsSeparator {
    pub fn new(
        program: impl Into<PathBuf>,
        model: impl Into<String>,
        format: StemFormat,
        runner: ToolRunner,
    ) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
            format,
            runner,
        }
    }

    pub fn from_settings(settings: &Settings, runner: ToolRunner) -> Self {
        Self::new(
            &settings.tools.demucs,
            &settings.separation.model,
            settings.separation.output_format,
            runner,
        )
    }

    pub fn build_invocation(&self, input: &Path, output_dir: &Path) -> ToolInvocation {
        let invocation = ToolInvocation::new("demucs", &self.program)
            .arg("-n")
            .arg(&self.model)
            .arg("--two-stems=vocals");
        let invocation = match self.format {
            StemFormat::Mp3 => invocation.arg("--mp3"),
            StemFormat::Wav => invocation,
        };
        invocation.arg("-o").arg(output_dir).arg(input)
    }
}

impl SeparationEngine for DemucsSeparator {
    fn model(&self) -> &str {
        &self.model
    }

    fn output_format(&self) -> StemFormat {
        self.format
    }

    fn separate(&self, input: &Path, output_dir: &Path) -> SeparationResult<PathBuf> {
        if !input.exists() {
            return Err(SeparationError::InputNotFound(input.to_path_buf()));
        }
        if is_lossy(input) {
            return Err(SeparationError::NeedsPcmInput(input.to_path_buf()));
        }

        self.runner
            .run(&self.build_invocation(input, output_dir))
            .map_err(|e| SeparationError::tool(input, e))?;

        tracing::info!("Separated {} with model {}", input.display(), self.model);
        Ok(output_dir.to_path_buf())
    }
}
