//! Transcribe step - run the shared speech model on the current input.

use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};
use crate::transcription::TranscriptionRequest;

pub struct TranscribeStep;

impl TranscribeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TranscribeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for TranscribeStep {
    fn name(&self) -> &str {
        "Transcribe"
    }

    fn stage(&self) -> JobStatus {
        JobStatus::Processing
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if !state.current_input.is_file() {
            return Err(StepError::invalid_input(format!(
                "audio file not found: {}",
                state.current_input.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let transcriber = &ctx.services.transcriber;
        let language = ctx.language();
        ctx.logger.info(&format!(
            "Transcribing {} with {} (language: {})",
            state.current_input.display(),
            transcriber.engine_name(),
            language
        ));

        let text = transcriber.transcribe(&TranscriptionRequest {
            audio: &state.current_input,
            language,
            scratch_dir: &ctx.work_dir,
        })?;

        if text.is_empty() {
            ctx.logger.warn("No speech recognized");
        } else {
            ctx.logger
                .info(&format!("Recognized {} characters", text.chars().count()));
        }
        state.transcript = Some(text);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.transcript.is_none() {
            return Err(StepError::invalid_input("no transcript recorded"));
        }
        Ok(())
    }
}
