//! In-process whisper.cpp backend.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::engine::{TranscriptionEngine, TranscriptionRequest};
use super::{TranscriptionError, TranscriptionResult};

/// whisper.cpp model loaded once and reused for every call.
///
/// Reads only speech-canonical WAV (mono, 16 kHz).
pub struct WhisperRsEngine {
    context: WhisperContext,
    model_path: PathBuf,
    temperature: f32,
}

impl WhisperRsEngine {
    pub fn load(model_path: impl AsRef<Path>, temperature: f32) -> TranscriptionResult<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(TranscriptionError::ModelNotFound(model_path.to_path_buf()));
        }

        let path_str = model_path
            .to_str()
            .ok_or_else(|| TranscriptionError::ModelLoadFailed("model path is not UTF-8".into()))?;
        let context = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| TranscriptionError::ModelLoadFailed(e.to_string()))?;

        tracing::info!("Loaded whisper model from {}", model_path.display());
        Ok(Self {
            context,
            model_path: model_path.to_path_buf(),
            temperature,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

/// Read a WAV file as normalized f32 samples.
fn load_samples(path: &Path) -> TranscriptionResult<Vec<f32>> {
    let reader =
        WavReader::open(path).map_err(|e| TranscriptionError::DecodingFailed(e.to_string()))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(TranscriptionError::DecodingFailed(format!(
            "expected mono audio, got {} channels",
            spec.channels
        )));
    }

    match spec.sample_format {
        SampleFormat::Int => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>(),
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>(),
    }
    .map_err(|e| TranscriptionError::DecodingFailed(e.to_string()))
}

impl TranscriptionEngine for WhisperRsEngine {
    fn name(&self) -> &str {
        "whisper-rs"
    }

    fn requires_canonical_input(&self) -> bool {
        true
    }

    fn transcribe(&mut self, request: &TranscriptionRequest<'_>) -> TranscriptionResult<String> {
        let samples = load_samples(request.audio)?;

        let mut state = self
            .context
            .create_state()
            .map_err(|e| TranscriptionError::InferenceFailed(e.to_string()))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(request.language));
        params.set_temperature(self.temperature);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| TranscriptionError::InferenceFailed(e.to_string()))?;

        let mut text = String::new();
        for i in 0..state.full_n_segments() {
            if let Some(segment) = state.get_segment(i) {
                let segment_text = segment
                    .to_str()
                    .map_err(|e| TranscriptionError::InferenceFailed(e.to_string()))?;
                text.push_str(segment_text);
            }
        }

        Ok(text.trim().to_string())
    }
}
