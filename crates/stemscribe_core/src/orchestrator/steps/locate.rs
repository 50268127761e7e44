//! Locate step - move the requested stem out of the separation tree.

use crate::conversion::converted_path;
use crate::models::JobStatus;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState};

pub struct LocateStep;

impl LocateStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for LocateStep {
    fn name(&self) -> &str {
        "Locate"
    }

    fn stage(&self) -> JobStatus {
        JobStatus::Locating
    }

    fn validate_input(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if state.separation.is_none() {
            return Err(StepError::invalid_input("separation has not run"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()> {
        let Some(separation) = state.separation.clone() else {
            return Err(StepError::invalid_input("separation has not run"));
        };
        let services = ctx.services;
        let layout = services.separator.layout(&separation.root);
        let stem = ctx.settings.separation.stem;

        ctx.logger.debug(&format!(
            "Expecting {}",
            layout.stem_path(&separation.basename, stem).display()
        ));
        let moved = services.locator.locate_and_move(
            &layout,
            &separation.basename,
            stem,
            &ctx.processed_dir,
        )?;

        let final_path = if services.locator.converts(layout.format()) {
            // The relocated stem is replaced by its WAV re-encode.
            state.intermediates.track(&moved);
            state.intermediates.track(converted_path(&moved));
            let converted = services.locator.finalize(&moved, layout.format())?;
            state.intermediates.release(&converted);
            converted
        } else {
            moved
        };

        ctx.logger
            .info(&format!("Result written to {}", final_path.display()));
        state.final_path = Some(final_path);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        match &state.final_path {
            Some(path) if path.is_file() => Ok(()),
            Some(path) => Err(StepError::missing_output(path, "locator")),
            None => Err(StepError::invalid_input("no result path recorded")),
        }
    }
}
