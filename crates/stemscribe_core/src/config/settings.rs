//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::{Stem, StemFormat, TranscriptionBackend};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Upload, output, scratch and log directories.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations and limits.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Target format for speech-canonical conversion.
    #[serde(default)]
    pub conversion: ConversionSettings,

    /// Vocal separation settings.
    #[serde(default)]
    pub separation: SeparationSettings,

    /// Speech model settings.
    #[serde(default)]
    pub transcription: TranscriptionSettings,

    /// Upload validation.
    #[serde(default)]
    pub intake: IntakeSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Identifies one TOML table in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Tools,
    Conversion,
    Separation,
    Transcription,
    Intake,
    Logging,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 7] = [
        Self::Paths,
        Self::Tools,
        Self::Conversion,
        Self::Separation,
        Self::Transcription,
        Self::Intake,
        Self::Logging,
    ];

    /// Name of the TOML table for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Paths => "paths",
            Self::Tools => "tools",
            Self::Conversion => "conversion",
            Self::Separation => "separation",
            Self::Transcription => "transcription",
            Self::Intake => "intake",
            Self::Logging => "logging",
        }
    }

    /// Comment written above the table in a freshly generated file.
    pub fn comment(&self) -> &'static str {
        match self {
            Self::Paths => "Upload, output, scratch and log directories",
            Self::Tools => "External tools (ffmpeg, demucs, whisper) and their limits",
            Self::Conversion => "Speech-canonical WAV format used before transcription",
            Self::Separation => "Vocal separation (demucs) settings",
            Self::Transcription => "Speech-to-text model settings",
            Self::Intake => "Upload validation",
            Self::Logging => "Logging configuration",
        }
    }
}

/// Directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Where staged uploads land.
    #[serde(default = "default_upload_folder")]
    pub upload_folder: String,

    /// Where the separation tool writes and final stems are published.
    #[serde(default = "default_processed_folder")]
    pub processed_folder: String,

    /// Root for per-job scratch directories.
    #[serde(default = "default_work_folder")]
    pub work_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_upload_folder() -> String {
    "uploads".to_string()
}

fn default_processed_folder() -> String {
    "static/processed".to_string()
}

fn default_work_folder() -> String {
    ".work".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            upload_folder: default_upload_folder(),
            processed_folder: default_processed_folder(),
            work_folder: default_work_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

impl PathSettings {
    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.upload_folder)
    }

    pub fn processed_dir(&self) -> PathBuf {
        PathBuf::from(&self.processed_folder)
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_folder)
    }

    pub fn logs_dir(&self) -> PathBuf {
        PathBuf::from(&self.logs_folder)
    }
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg executable (name on PATH or absolute path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// demucs executable.
    #[serde(default = "default_demucs")]
    pub demucs: String,

    /// whisper executable (used by the `whisper_cli` backend).
    #[serde(default = "default_whisper")]
    pub whisper: String,

    /// Kill a tool after this many seconds. 0 disables the limit.
    #[serde(default)]
    pub timeout_secs: u64,

    /// Maximum number of external tools running at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_demucs() -> String {
    "demucs".to_string()
}

fn default_whisper() -> String {
    "whisper".to_string()
}

fn default_max_concurrent() -> usize {
    2
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            demucs: default_demucs(),
            whisper: default_whisper(),
            timeout_secs: 0,
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl ToolSettings {
    /// The configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Speech-canonical target format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSettings {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    /// ffmpeg audio codec name; must be a 16-bit PCM codec.
    #[serde(default = "default_codec")]
    pub codec: String,
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_channels() -> u16 {
    1
}

fn default_codec() -> String {
    "pcm_s16le".to_string()
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            codec: default_codec(),
        }
    }
}

/// Vocal separation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationSettings {
    /// Model variant passed to `-n`; also the first level of the output tree.
    #[serde(default = "default_model")]
    pub model: String,

    /// Which stem is published as the job result.
    #[serde(default)]
    pub stem: Stem,

    /// Encoding demucs writes (`mp3` adds `--mp3`).
    #[serde(default)]
    pub output_format: StemFormat,

    /// Re-encode the published stem to WAV after moving it.
    #[serde(default)]
    pub convert_stem_to_wav: bool,
}

fn default_model() -> String {
    "mdx".to_string()
}

impl Default for SeparationSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            stem: Stem::default(),
            output_format: StemFormat::default(),
            convert_stem_to_wav: false,
        }
    }
}

/// Speech model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    #[serde(default)]
    pub backend: TranscriptionBackend,

    /// Model name for the whisper CLI (`tiny`, `base`, ..., `large`).
    #[serde(default = "default_whisper_model")]
    pub model: String,

    /// ggml model file for the whisper-rs backend.
    #[serde(default)]
    pub model_path: String,

    /// Language used when a job carries no hint.
    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default)]
    pub temperature: f32,

    /// Convert uploads to speech-canonical WAV before transcribing,
    /// even when the backend could decode them directly.
    #[serde(default = "default_true")]
    pub normalize_input: bool,
}

fn default_whisper_model() -> String {
    "medium".to_string()
}

fn default_language() -> String {
    "pl".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            backend: TranscriptionBackend::default(),
            model: default_whisper_model(),
            model_path: String::new(),
            default_language: default_language(),
            temperature: 0.0,
            normalize_input: true,
        }
    }
}

/// Upload validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeSettings {
    /// Lower-case extensions accepted at intake.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["mp3".to_string(), "wav".to_string()]
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default)]
    pub level: LogLevel,

    /// Keep tool output in the tail buffer only, instead of every line.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show after an error.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    #[serde(default = "default_true")]
    pub show_timestamps: bool,

    /// Write a log file per job.
    #[serde(default = "default_true")]
    pub job_logs: bool,
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
            job_logs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_upload_and_processed_dirs() {
        let settings = Settings::default();
        assert_eq!(settings.paths.upload_folder, "uploads");
        assert_eq!(settings.paths.processed_folder, "static/processed");
        assert_eq!(settings.separation.model, "mdx");
        assert_eq!(settings.separation.stem, Stem::NoVocals);
        assert_eq!(settings.transcription.default_language, "pl");
        assert_eq!(settings.intake.max_upload_bytes, 52_428_800);
    }

    #[test]
    fn zero_timeout_means_unlimited() {
        let mut tools = ToolSettings::default();
        assert_eq!(tools.timeout(), None);
        tools.timeout_secs = 30;
        assert_eq!(tools.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            "[separation]\nmodel = \"htdemucs\"\noutput_format = \"wav\"\n",
        )
        .unwrap();
        assert_eq!(settings.separation.model, "htdemucs");
        assert_eq!(settings.separation.output_format, StemFormat::Wav);
        assert_eq!(settings.tools.ffmpeg, "ffmpeg");
        assert_eq!(settings.conversion.sample_rate, 16_000);
    }
}
