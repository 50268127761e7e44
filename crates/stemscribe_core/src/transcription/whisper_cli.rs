//! openai-whisper command-line backend.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::tools::{ToolInvocation, ToolRunner};

use super::engine::{TranscriptionEngine, TranscriptionRequest};
use super::{TranscriptionError, TranscriptionResult};

/// Runs the `whisper` CLI and reads back its `.json` output.
///
/// The model is loaded by the tool on every call, so this engine holds no
/// decoder state of its own.
pub struct WhisperCliEngine {
    program: PathBuf,
    model: String,
    temperature: f32,
    runner: ToolRunner,
}

impl WhisperCliEngine {
    pub fn new(
        program: impl Into<PathBuf>,
        model: impl Into<String>,
        temperature: f32,
        runner: ToolRunner,
    ) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
            temperature,
            runner,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_invocation(&self, request: &TranscriptionRequest<'_>) -> ToolInvocation {
        ToolInvocation::new("whisper", &self.program)
            .arg(request.audio)
            .arg("--model")
            .arg(&self.model)
            .arg("--language")
            .arg(request.language)
            .arg("--temperature")
            .arg(self.temperature.to_string())
            .args(["--output_format", "json", "--output_dir"])
            .arg(request.scratch_dir)
            .args(["--verbose", "False"])
    }
}

/// The part of whisper's JSON result we use. `text` is every segment
/// concatenated; segments themselves are ignored.
#[derive(Debug, Deserialize)]
struct WhisperResult {
    text: String,
}

/// Where the CLI writes the transcript for `audio`.
fn transcript_path(audio: &Path, scratch_dir: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    scratch_dir.join(format!("{}.json", stem))
}

impl TranscriptionEngine for WhisperCliEngine {
    fn name(&self) -> &str {
        "whisper-cli"
    }

    fn transcribe(&mut self, request: &TranscriptionRequest<'_>) -> TranscriptionResult<String> {
        fs::create_dir_all(request.scratch_dir)?;
        self.runner.run(&self.build_invocation(request))?;

        let transcript = transcript_path(request.audio, request.scratch_dir);
        if !transcript.exists() {
            return Err(TranscriptionError::MissingTranscript(transcript));
        }
        let raw = fs::read_to_string(&transcript)?;
        let result: WhisperResult = serde_json::from_str(&raw).map_err(|source| {
            TranscriptionError::MalformedTranscript {
                path: transcript.clone(),
                source,
            }
        })?;
        Ok(result.text.trim().to_string())
    }
}
