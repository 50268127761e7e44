//! Separate step - split the current input into vocal and instrumental stems.

use crate::conversion::is_lossy;
use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, SeparationOutput};
use crate::separation::input_basename;

pub struct SeparateStep;

impl SeparateStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SeparateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SeparateStep {
    fn name(&self) -> &str {
        "Separate"
    }

    fn stage(&self) -> JobStatus {
        JobStatus::Processing
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let input = &state.current_input;
        if !input.is_file() {
            return Err(StepError::invalid_input(format!(
                "audio file not found: {}",
                input.display()
            )));
        }
        if is_lossy(input) {
            return Err(StepError::invalid_input(format!(
                "{} must be converted to WAV before separation",
                input.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let separator = &ctx.services.separator;
        let input = state.current_input.clone();
        let basename = input_basename(&input);

        // Only this input's subtree is ours; the model dir is shared.
        let layout = separator.layout(&ctx.processed_dir);
        state.intermediates.track(layout.job_dir(&basename));

        ctx.logger.info(&format!(
            "Separating {} with model {}",
            input.display(),
            separator.model()
        ));
        let root = separator.separate(&input, &ctx.processed_dir)?;

        state.separation = Some(SeparationOutput { root, basename });
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.separation.is_none() {
            return Err(StepError::invalid_input("no separation output recorded"));
        }
        Ok(())
    }
}
