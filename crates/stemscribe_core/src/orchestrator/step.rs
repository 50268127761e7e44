//! Pipeline step trait definition.

use crate::models::JobStatus;

use super::errors::StepResult;
use super::types::{Context, JobState};

/// Trait for pipeline steps.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `skip_reason` - Decide whether the step applies to this job at all
/// 2. `validate_input` - Check preconditions before execution
/// 3. `execute` - Perform the step's work
/// 4. `validate_output` - Verify the step produced its output
///
/// The job enters `stage()` only if the step is not skipped.
pub trait PipelineStep: Send + Sync {
    /// Step name (for logging and error context).
    fn name(&self) -> &str;

    /// Status the job is in while this step runs.
    fn stage(&self) -> JobStatus;

    /// `Some(reason)` when the step has nothing to do for this job.
    fn skip_reason(&self, _ctx: &Context, _state: &JobState) -> Option<String> {
        None
    }

    fn validate_input(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Perform the step and record results in `state`.
    ///
    /// Any file the step may create must be tracked in
    /// `state.intermediates` before the tool that creates it runs.
    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<()>;

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;
}
