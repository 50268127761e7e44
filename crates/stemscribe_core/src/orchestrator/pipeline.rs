//! Ordered execution of a job's steps.

use super::errors::{PipelineError, PipelineResult, StepError};
use super::step::PipelineStep;
use super::types::{Context, JobState};

/// Steps run front to back. The first error ends the run.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

/// Which steps did work and which were skipped, by name.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: impl PipelineStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// A step that is not skipped moves the job into its stage before
    /// `validate_input`. Progress is recorded in `state.steps` as it happens,
    /// so a failed run still shows what ran before the failure.
    pub fn run(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<()> {
        for step in &self.steps {
            let name = step.name().to_string();
            if let Some(reason) = step.skip_reason(ctx, state) {
                ctx.logger.info(&format!("{name} skipped: {reason}"));
                state.steps.skipped.push(name);
                continue;
            }
            run_step(step.as_ref(), ctx, state)?;
            state.steps.completed.push(name);
        }
        Ok(())
    }
}

fn run_step(step: &dyn PipelineStep, ctx: &Context, state: &mut JobState) -> PipelineResult<()> {
    let name = step.name();
    state.set_status(step.stage());
    ctx.logger.stage(name);

    step.validate_input(ctx, state)
        .and_then(|()| step.execute(ctx, state))
        .and_then(|()| step.validate_output(ctx, state))
        .map_err(|e| abort(ctx, name, e))?;
    ctx.logger.success(&format!("{name} completed"));
    Ok(())
}

fn abort(ctx: &Context, step_name: &str, error: StepError) -> PipelineError {
    if let Some(stderr) = error.tool_stderr() {
        ctx.logger.tool_output(stderr);
    }
    ctx.logger.error(&format!("{step_name}: {error}"));
    PipelineError::step_failed(ctx.job_id(), step_name, error)
}
