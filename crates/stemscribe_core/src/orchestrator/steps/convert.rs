//! Convert step - transcode the current input to WAV when a stage needs it.

use crate::conversion::{converted_path, is_canonical_wav, is_lossy, ConversionProfile};
use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};

/// Transcodes the job's current input with ffmpeg.
///
/// For transcription the target is speech-canonical WAV, skipped when the
/// input already is one (or when normalization is off and the model reads
/// anything). For separation the target is PCM WAV and only lossy input is
/// converted.
pub struct ConvertStep {
    profile: ConversionProfile,
}

impl ConvertStep {
    pub fn for_transcription() -> Self {
        Self {
            profile: ConversionProfile::SpeechCanonical,
        }
    }

    pub fn for_separation() -> Self {
        Self {
            profile: ConversionProfile::PcmWav,
        }
    }
}

impl PipelineStep for ConvertStep {
    fn name(&self) -> &str {
        "Convert"
    }

    fn stage(&self) -> JobStatus {
        JobStatus::Converting
    }

    fn skip_reason(&self, ctx: &Context, state: &JobState) -> Option<String> {
        let input = &state.current_input;
        match self.profile {
            ConversionProfile::SpeechCanonical => {
                let required = ctx.services.transcriber.requires_canonical_input();
                if !required && !ctx.settings.transcription.normalize_input {
                    Some("speech model reads the upload directly".to_string())
                } else if is_canonical_wav(input, ctx.services.converter.target()) {
                    Some("input is already speech-canonical WAV".to_string())
                } else {
                    None
                }
            }
            ConversionProfile::PcmWav => {
                (!is_lossy(input)).then(|| "input is not lossy".to_string())
            }
        }
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if !state.current_input.is_file() {
            return Err(StepError::invalid_input(format!(
                "input file not found: {}",
                state.current_input.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let converter = &ctx.services.converter;
        let input = state.current_input.clone();
        let output = converted_path(&input);

        state.intermediates.track(&output);
        ctx.logger.command(
            &converter
                .build_invocation(&input, &output, self.profile)
                .command_line(),
        );

        state.current_input = converter.convert(&input, self.profile)?;
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if !state.current_input.is_file() {
            return Err(StepError::missing_output(&state.current_input, "ffmpeg"));
        }
        Ok(())
    }
}
