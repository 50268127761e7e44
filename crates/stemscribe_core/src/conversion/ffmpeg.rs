//! ffmpeg command wrapper.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};

use crate::config::{ConversionSettings, Settings};
use crate::tools::{ToolInvocation, ToolRunner};

use super::{ConversionError, ConversionProfile, ConversionResult};

/// Extensions treated as lossy-compressed input.
const LOSSY_EXTENSIONS: &[&str] = &["mp3"];

/// Transcodes audio files to WAV with ffmpeg.
#[derive(Clone)]
pub struct FormatConverter {
    program: PathBuf,
    target: ConversionSettings,
    runner: ToolRunner,
}

impl FormatConverter {
    pub fn new(program: impl Into<PathBuf>, target: ConversionSettings, runner: ToolRunner) -> Self {
        Self {
            program: program.into(),
            target,
            runner,
        }
    }

    pub fn from_settings(settings: &Settings, runner: ToolRunner) -> Self {
        Self::new(&settings.tools.ffmpeg, settings.conversion.clone(), runner)
    }

    /// Speech-canonical target format.
    pub fn target(&self) -> &ConversionSettings {
        &self.target
    }

    /// Convert `input` to WAV next to it and return the new path.
    ///
    /// The input is left in place. The output path is derived from the
    /// input by replacing its extension (see [`converted_path`]).
    pub fn convert(&self, input: &Path, profile: ConversionProfile) -> ConversionResult<PathBuf> {
        if !input.exists() {
            return Err(ConversionError::InputNotFound(input.to_path_buf()));
        }

        let output = converted_path(input);
        let invocation = self.build_invocation(input, &output, profile);

        self.runner
            .run(&invocation)
            .map_err(|e| ConversionError::tool(input, e))?;

        if !output.exists() {
            return Err(ConversionError::MissingOutput(output));
        }

        tracing::info!(
            "Converted {} to {} ({:?})",
            input.display(),
            output.display(),
            profile
        );
        Ok(output)
    }

    /// Build the ffmpeg command line for one conversion.
    pub fn build_invocation(
        &self,
        input: &Path,
        output: &Path,
        profile: ConversionProfile,
    ) -> ToolInvocation {
        let invocation = ToolInvocation::new("ffmpeg", &self.program)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(input);

        let invocation = match profile {
            ConversionProfile::SpeechCanonical => invocation
                .args(["-f", "wav", "-acodec"])
                .arg(&self.target.codec)
                .arg("-ac")
                .arg(self.target.channels.to_string())
                .arg("-ar")
                .arg(self.target.sample_rate.to_string()),
            ConversionProfile::PcmWav => invocation.args(["-f", "wav", "-acodec", "pcm_s16le"]),
        };

        invocation.arg(output)
    }
}

/// Output path for converting `input` to WAV.
///
/// `song.mp3` becomes `song.wav`. A `.wav` input gets a distinct name
/// (`song.converted.wav`) so the source is never overwritten.
pub fn converted_path(input: &Path) -> PathBuf {
    let candidate = input.with_extension("wav");
    if candidate != input {
        return candidate;
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}.converted.wav", stem))
}

/// Whether the file extension names a lossy-compressed format.
pub fn is_lossy(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| LOSSY_EXTENSIONS.iter().any(|l| e.eq_ignore_ascii_case(l)))
        .unwrap_or(false)
}

/// Whether `path` is a WAV already in the speech-canonical format.
///
/// Unreadable or non-WAV files are not canonical.
pub fn is_canonical_wav(path: &Path, target: &ConversionSettings) -> bool {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);
    if !is_wav {
        return false;
    }

    match WavReader::open(path) {
        Ok(reader) => {
            let spec = reader.spec();
            spec.channels == target.channels
                && spec.sample_rate == target.sample_rate
                && spec.bits_per_sample == 16
                && spec.sample_format == SampleFormat::Int
        }
        Err(e) => {
            tracing::debug!("{} is not a readable WAV: {}", path.display(), e);
            false
        }
    }
}
