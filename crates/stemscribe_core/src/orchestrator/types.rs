//! Core types for the orchestrator pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::config::Settings;
use crate::conversion::FormatConverter;
use crate::logging::JobLogger;
use crate::models::{Job, JobStatus};
use crate::separation::{OutputLocator, SeparationEngine};
use crate::transcription::SharedTranscriber;

use super::intermediates::Intermediates;
use super::pipeline::PipelineRunResult;

/// Adapters shared by every job an orchestrator runs.
pub struct Services {
    pub converter: FormatConverter,
    pub transcriber: SharedTranscriber,
    pub separator: Box<dyn SeparationEngine>,
    pub locator: OutputLocator,
}

/// Read-only context passed to pipeline steps.
///
/// Mutable state goes in `JobState`.
pub struct Context<'a> {
    pub job: &'a Job,
    pub settings: &'a Settings,
    pub services: &'a Services,
    /// Scratch directory owned by this job.
    pub work_dir: PathBuf,
    /// Where separation output trees and final stems are written.
    pub processed_dir: PathBuf,
    /// Per-job logger.
    pub logger: Arc<JobLogger>,
}

impl<'a> Context<'a> {
    pub fn new(
        job: &'a Job,
        settings: &'a Settings,
        services: &'a Services,
        work_dir: PathBuf,
        logger: Arc<JobLogger>,
    ) -> Self {
        Self {
            job,
            settings,
            services,
            work_dir,
            processed_dir: settings.paths.processed_dir(),
            logger,
        }
    }

    pub fn job_id(&self) -> &str {
        self.job.id().as_str()
    }

    /// Language for the speech model, falling back to the configured default.
    pub fn language(&self) -> &str {
        self.job
            .language_or(&self.settings.transcription.default_language)
    }
}

/// Where a separation run left its output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparationOutput {
    /// Directory given to the tool as its output root.
    pub root: PathBuf,
    /// Basename of the input the tool was run on.
    pub basename: String,
}

/// Mutable job state that accumulates results from pipeline steps.
#[derive(Debug)]
pub struct JobState {
    pub job_id: String,
    pub started_at: DateTime<Local>,
    pub status: JobStatus,
    /// Every status the job has been in, in order.
    pub history: Vec<JobStatus>,
    /// File the next step reads. Starts as the staged upload.
    pub current_input: PathBuf,
    pub intermediates: Intermediates,
    /// Steps run or skipped so far, kept when a later step fails.
    pub steps: PipelineRunResult,
    pub separation: Option<SeparationOutput>,
    pub transcript: Option<String>,
    pub final_path: Option<PathBuf>,
}

impl JobState {
    pub fn new(job_id: impl Into<String>, input: &Path) -> Self {
        Self {
            job_id: job_id.into(),
            started_at: Local::now(),
            status: JobStatus::Created,
            history: vec![JobStatus::Created],
            current_input: input.to_path_buf(),
            intermediates: Intermediates::new(),
            steps: PipelineRunResult::default(),
            separation: None,
            transcript: None,
            final_path: None,
        }
    }

    pub fn set_status(&mut self, status: JobStatus) {
        if self.status != status {
            self.status = status;
            self.history.push(status);
        }
    }

    /// Whether the job ever entered `status`.
    pub fn visited(&self, status: JobStatus) -> bool {
        self.history.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_history_records_transitions_once() {
        let mut state = JobState::new("job-1", Path::new("in.wav"));
        state.set_status(JobStatus::Processing);
        state.set_status(JobStatus::Processing);
        state.set_status(JobStatus::Done);

        assert_eq!(
            state.history,
            vec![JobStatus::Created, JobStatus::Processing, JobStatus::Done]
        );
        assert!(!state.visited(JobStatus::Converting));
        assert_eq!(state.current_input, PathBuf::from("in.wav"));
        assert!(state.steps.completed.is_empty());
    }
}
