//! Runs one job end to end and guarantees its cleanup.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::config::Settings;
use crate::conversion::FormatConverter;
use crate::logging::{JobLogger, LogConfig};
use crate::models::{Job, JobOutput, JobStatus, Operation};
use crate::separation::{DemucsSeparator, OutputLocator, SeparationEngine};
use crate::tools::ToolRunner;
use crate::transcription::{engine_from_settings, SharedTranscriber, TranscriptionResult};

use super::errors::{PipelineError, PipelineResult, StepError};
use super::intermediates::CleanupReport;
use super::pipeline::{Pipeline, PipelineRunResult};
use super::steps::{ConvertStep, LocateStep, SeparateStep, TranscribeStep};
use super::types::{Context, JobState, Services};

/// Everything known about a job after it ended.
#[derive(Debug)]
pub struct JobReport {
    pub job_id: String,
    pub started_at: DateTime<Local>,
    /// `Done` or `Failed(kind)`.
    pub status: JobStatus,
    pub history: Vec<JobStatus>,
    pub steps: PipelineRunResult,
    pub cleanup: CleanupReport,
    pub result: PipelineResult<JobOutput>,
}

/// Sequences the stages of each job and owns the shared adapters.
///
/// `process` may be called from several threads at once; jobs only share
/// the tool slot pool and the transcriber lock.
pub struct Orchestrator {
    settings: Settings,
    services: Services,
    log_config: LogConfig,
}

impl Orchestrator {
    pub fn new(settings: Settings, runner: ToolRunner, transcriber: SharedTranscriber) -> Self {
        let converter = FormatConverter::from_settings(&settings, runner.clone());
        let locator = locator_for(&settings, &converter);
        let services = Services {
            separator: Box::new(DemucsSeparator::from_settings(&settings, runner)),
            converter,
            transcriber,
            locator,
        };
        Self {
            log_config: LogConfig::from(&settings.logging),
            settings,
            services,
        }
    }

    /// Build the tool runner and transcription engine from `settings`.
    pub fn from_settings(settings: Settings) -> TranscriptionResult<Self> {
        let runner = ToolRunner::from_settings(&settings.tools);
        let transcriber = engine_from_settings(&settings, &runner)?;
        Ok(Self::new(settings, runner, transcriber))
    }

    /// Replace the separation engine.
    pub fn with_separator(mut self, separator: impl SeparationEngine + 'static) -> Self {
        self.services.separator = Box::new(separator);
        self
    }

    /// Replace the format converter (also used for stem post-conversion).
    pub fn with_converter(mut self, converter: FormatConverter) -> Self {
        self.services.locator = locator_for(&self.settings, &converter);
        self.services.converter = converter;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Steps for `operation`, in order.
    pub fn pipeline_for(operation: Operation) -> Pipeline {
        match operation {
            Operation::Transcribe => Pipeline::new()
                .with_step(ConvertStep::for_transcription())
                .with_step(TranscribeStep::new()),
            Operation::SeparateVocals => Pipeline::new()
                .with_step(ConvertStep::for_separation())
                .with_step(SeparateStep::new())
                .with_step(LocateStep::new()),
        }
    }

    /// Run `job` and return its result.
    ///
    /// Every file the job created, and its input, is gone when this returns.
    /// The only survivor is a separation result file.
    pub fn process(&self, job: &Job) -> PipelineResult<JobOutput> {
        self.run(job).result
    }

    /// Like `process`, but also returns the status history and cleanup report.
    pub fn run(&self, job: &Job) -> JobReport {
        let job_id = job.id().to_string();
        let logger = self.job_logger(&job_id);
        let mut state = JobState::new(&job_id, job.input_path());
        state.intermediates.track(job.input_path());

        logger.info(&format!(
            "Starting {} job for {} at {}",
            job.operation(),
            job.input_path().display(),
            state.started_at.format("%Y-%m-%d %H:%M:%S")
        ));

        let outcome = self.drive(job, &logger, &mut state);

        match &outcome {
            Ok(_) => state.set_status(JobStatus::Done),
            Err(e) => {
                state.set_status(JobStatus::Failed(e.kind()));
                logger.show_tail("tool");
            }
        }

        logger.stage("Cleanup");
        let cleanup = state.intermediates.cleanup();
        for path in &cleanup.removed {
            logger.cleanup(&format!("Removed {}", path.display()));
        }
        for (path, error) in &cleanup.failed {
            logger.warn(&format!("Could not remove {}: {}", path.display(), error));
        }
        if !cleanup.is_clean() {
            logger.warn(&format!("{} path(s) left behind", cleanup.failed.len()));
        }

        match &outcome {
            Ok(_) => logger.success(&format!("Job {} done", job_id)),
            Err(e) => logger.error(&format!("Job failed ({}): {}", e.kind().name(), e.detail())),
        }
        logger.close();

        JobReport {
            job_id,
            started_at: state.started_at,
            status: state.status,
            history: std::mem::take(&mut state.history),
            steps: std::mem::take(&mut state.steps),
            cleanup,
            result: outcome,
        }
    }

    fn drive(
        &self,
        job: &Job,
        logger: &Arc<JobLogger>,
        state: &mut JobState,
    ) -> PipelineResult<JobOutput> {
        let job_id = job.id().as_str();
        if !job.input_path().is_file() {
            return Err(PipelineError::setup_failed(
                job_id,
                format!("input file not found: {}", job.input_path().display()),
            ));
        }

        let work_dir = self.settings.paths.work_dir().join(job_id);
        state.intermediates.track(&work_dir);
        create_dir(job_id, &work_dir)?;
        create_dir(job_id, &self.settings.paths.processed_dir())?;

        let ctx = Context::new(
            job,
            &self.settings,
            &self.services,
            work_dir,
            Arc::clone(logger),
        );
        let pipeline = Self::pipeline_for(job.operation());
        logger.debug(&format!("Steps: {}", pipeline.step_names().join(" -> ")));
        pipeline.run(&ctx, state)?;
        collect_output(job, state)
    }

    fn job_logger(&self, job_id: &str) -> Arc<JobLogger> {
        if !self.settings.logging.job_logs {
            return Arc::new(JobLogger::detached(job_id, self.log_config.clone()));
        }
        match JobLogger::new(job_id, self.settings.paths.logs_dir(), self.log_config.clone()) {
            Ok(logger) => Arc::new(logger),
            Err(e) => {
                tracing::warn!("Job log file unavailable for {}: {}", job_id, e);
                Arc::new(JobLogger::detached(job_id, self.log_config.clone()))
            }
        }
    }
}

fn locator_for(settings: &Settings, converter: &FormatConverter) -> OutputLocator {
    if settings.separation.convert_stem_to_wav {
        OutputLocator::new().with_post_converter(converter.clone())
    } else {
        OutputLocator::new()
    }
}

fn create_dir(job_id: &str, dir: &Path) -> PipelineResult<()> {
    fs::create_dir_all(dir).map_err(|e| {
        PipelineError::setup_failed(job_id, format!("cannot create {}: {}", dir.display(), e))
    })
}

/// Pull the operation's result out of a finished state.
fn collect_output(job: &Job, state: &mut JobState) -> PipelineResult<JobOutput> {
    let job_id = job.id().as_str();
    match job.operation() {
        Operation::Transcribe => state
            .transcript
            .take()
            .map(JobOutput::Transcript)
            .ok_or_else(|| {
                PipelineError::step_failed(
                    job_id,
                    "Transcribe",
                    StepError::invalid_input("no transcript recorded"),
                )
            }),
        Operation::SeparateVocals => {
            let path = state.final_path.take().ok_or_else(|| {
                PipelineError::step_failed(
                    job_id,
                    "Locate",
                    StepError::invalid_input("no result path recorded"),
                )
            })?;
            // Results are never cleanup targets, even if a step tracked them.
            state.intermediates.release(&path);
            let public_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(JobOutput::Stem { path, public_name })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::intake::UploadIntake;
    use crate::models::{ErrorKind, Stem, StemFormat};
    use crate::separation::{input_basename, SeparationResult};
    use crate::test_support::{
        failing_tool, fake_demucs, fake_ffmpeg, fake_whisper, sandbox_settings,
        write_wav, DemucsBehavior, FixedEngine,
    };
    use crate::transcription::{
        TranscriptionEngine, TranscriptionError, TranscriptionRequest, WhisperCliEngine,
    };
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    struct Rig {
        dir: TempDir,
        settings: Settings,
    }

    impl Rig {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let settings = sandbox_settings(dir.path());
            fs::create_dir_all(dir.path().join("bin")).unwrap();
            Self { dir, settings }
        }

        fn bin(&self) -> PathBuf {
            self.dir.path().join("bin")
        }

        fn log(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn upload(&self, name: &str, bytes: &[u8]) -> PathBuf {
            let path = self.settings.paths.upload_dir().join(name);
            fs::write(&path, bytes).unwrap();
            path
        }

        fn use_ffmpeg(&mut self, path: PathBuf) {
            self.settings.tools.ffmpeg = path.display().to_string();
        }

        fn use_demucs(&mut self, path: PathBuf) {
            self.settings.tools.demucs = path.display().to_string();
        }

        fn orchestrator(&self, engine: impl TranscriptionEngine + 'static) -> Orchestrator {
            Orchestrator::new(
                self.settings.clone(),
                ToolRunner::from_settings(&self.settings.tools),
                SharedTranscriber::new(engine),
            )
        }

        fn processed(&self, name: &str) -> PathBuf {
            self.settings.paths.processed_dir().join(name)
        }

        fn work_dir_is_empty(&self) -> bool {
            fs::read_dir(self.settings.paths.work_dir())
                .unwrap()
                .next()
                .is_none()
        }
    }

    fn logged(path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_default()
    }

    struct FailingEngine;

    impl TranscriptionEngine for FailingEngine {
        fn name(&self) -> &str {
            "failing"
        }

        fn transcribe(&mut self, _request: &TranscriptionRequest<'_>) -> TranscriptionResult<String> {
            Err(TranscriptionError::DecodingFailed("unsupported codec".into()))
        }
    }

    #[test]
    fn transcribe_mp3_converts_then_cleans_both_files() {
        let mut rig = Rig::new();
        let ffmpeg_log = rig.log("ffmpeg.log");
        rig.use_ffmpeg(fake_ffmpeg(&rig.bin(), Some(&ffmpeg_log)));
        let input = rig.upload("sample.mp3", b"ID3");
        let converted = input.with_extension("wav");

        let job = Job::new(&input, Operation::Transcribe).with_language("en");
        let report = rig.orchestrator(FixedEngine::new("hello world")).run(&job);

        let output = report.result.unwrap();
        assert_eq!(output.transcript(), Some("hello world"));
        assert!(logged(&ffmpeg_log).contains("sample.mp3"));
        assert!(!input.exists());
        assert!(!converted.exists());
        assert!(rig.work_dir_is_empty());
        assert_eq!(
            report.history,
            vec![
                JobStatus::Created,
                JobStatus::Converting,
                JobStatus::Processing,
                JobStatus::Done
            ]
        );
        assert!(report.cleanup.removed.contains(&converted));
    }

    #[test]
    fn transcribe_canonical_wav_skips_conversion() {
        let rig = Rig::new();
        let input = rig.settings.paths.upload_dir().join("speech.wav");
        write_wav(&input, 1, 16_000);

        // ffmpeg points at a missing program, so any conversion would fail.
        let job = Job::new(&input, Operation::Transcribe);
        let report = rig.orchestrator(FixedEngine::new("")).run(&job);

        assert_eq!(report.result.unwrap().transcript(), Some(""));
        assert!(!report.history.contains(&JobStatus::Converting));
        assert_eq!(report.steps.skipped, vec!["Convert"]);
        assert!(!input.exists());
    }

    #[test]
    fn transcription_is_repeatable() {
        let mut rig = Rig::new();
        rig.use_ffmpeg(fake_ffmpeg(&rig.bin(), None));
        let engine = FixedEngine::new("dzien dobry");
        let calls = Arc::clone(&engine.calls);
        let orchestrator = rig.orchestrator(engine);
        let intake = UploadIntake::from_settings(&rig.settings);

        let texts: Vec<_> = (0..2)
            .map(|_| {
                let staged = intake.stage_bytes(b"ID3", "clip.mp3").unwrap();
                let job = staged.into_job(Operation::Transcribe).with_language("pl");
                orchestrator.process(&job).unwrap()
            })
            .collect();

        assert_eq!(texts[0], texts[1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn transcription_failure_is_reported_and_cleaned() {
        let mut rig = Rig::new();
        rig.use_ffmpeg(fake_ffmpeg(&rig.bin(), None));
        let input = rig.upload("sample.mp3", b"ID3");
        let before = Local::now();

        let report = rig
            .orchestrator(FailingEngine)
            .run(&Job::new(&input, Operation::Transcribe));

        assert!(report.started_at >= before && report.started_at <= Local::now());
        let err = report.result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transcription);
        assert_eq!(report.status, JobStatus::Failed(ErrorKind::Transcription));
        assert!(!input.exists());
        assert!(!input.with_extension("wav").exists());
    }

    #[test]
    fn whisper_cli_transcript_and_scratch_are_handled() {
        let mut rig = Rig::new();
        rig.settings.transcription.normalize_input = false;
        let whisper = fake_whisper(&rig.bin(), &["Ala ma kota."]);
        let input = rig.upload("note.wav", b"RIFF");

        let runner = ToolRunner::from_settings(&rig.settings.tools);
        let engine = WhisperCliEngine::new(&whisper, "medium", 0.0, runner.clone());
        let orchestrator =
            Orchestrator::new(rig.settings.clone(), runner, SharedTranscriber::new(engine));

        let output = orchestrator
            .process(&Job::new(&input, Operation::Transcribe))
            .unwrap();
        assert_eq!(output, JobOutput::Transcript("Ala ma kota.".into()));
        assert!(rig.work_dir_is_empty());
    }

    #[test]
    fn separate_wav_moves_stem_and_never_converts() {
        let mut rig = Rig::new();
        let demucs_log = rig.log("demucs.log");
        rig.use_ffmpeg(failing_tool(&rig.bin(), "ffmpeg", 1, "should not run"));
        rig.use_demucs(fake_demucs(&rig.bin(), DemucsBehavior::Separate, Some(&demucs_log)));
        let input = rig.upload("track.wav", b"RIFF");

        let report = rig
            .orchestrator(FixedEngine::new(""))
            .run(&Job::new(&input, Operation::SeparateVocals));

        let output = report.result.unwrap();
        let expected = rig.processed("track_no_vocals.mp3");
        assert_eq!(
            output,
            JobOutput::Stem {
                path: expected.clone(),
                public_name: "track_no_vocals.mp3".into(),
            }
        );
        assert!(expected.exists());
        assert!(!rig.processed("mdx/track").exists());
        assert!(!input.exists());
        assert!(logged(&demucs_log).contains("track.wav"));
        assert!(!report.history.contains(&JobStatus::Converting));
        assert_eq!(report.status, JobStatus::Done);
    }

    #[test]
    fn separate_mp3_converts_before_separation() {
        let mut rig = Rig::new();
        let ffmpeg_log = rig.log("ffmpeg.log");
        let demucs_log = rig.log("demucs.log");
        rig.use_ffmpeg(fake_ffmpeg(&rig.bin(), Some(&ffmpeg_log)));
        rig.use_demucs(fake_demucs(&rig.bin(), DemucsBehavior::Separate, Some(&demucs_log)));
        let input = rig.upload("song.mp3", b"ID3");

        let output = rig
            .orchestrator(FixedEngine::new(""))
            .process(&Job::new(&input, Operation::SeparateVocals))
            .unwrap();

        assert!(logged(&ffmpeg_log).contains("song.mp3"));
        assert!(logged(&demucs_log).contains("song.wav"));
        assert_eq!(output.stem_path(), Some(rig.processed("song_no_vocals.mp3").as_path()));
        assert!(!input.exists());
        assert!(!input.with_extension("wav").exists());
    }

    #[test]
    fn silent_separator_is_missing_output() {
        let mut rig = Rig::new();
        rig.use_demucs(fake_demucs(&rig.bin(), DemucsBehavior::SilentSuccess, None));
        let input = rig.upload("track.wav", b"RIFF");

        let report = rig
            .orchestrator(FixedEngine::new(""))
            .run(&Job::new(&input, Operation::SeparateVocals));

        assert_eq!(report.result.unwrap_err().kind(), ErrorKind::MissingOutput);
        assert_eq!(report.status, JobStatus::Failed(ErrorKind::MissingOutput));
        assert!(!rig.processed("track_no_vocals.mp3").exists());
        assert!(!input.exists());
        // Steps that ran before the failure stay in the report.
        assert_eq!(report.steps.skipped, vec!["Convert"]);
        assert_eq!(report.steps.completed, vec!["Separate"]);
    }

    #[test]
    fn separator_crash_fails_and_removes_partial_tree() {
        let mut rig = Rig::new();
        rig.use_demucs(fake_demucs(
            &rig.bin(),
            DemucsBehavior::CrashAfterPartialOutput,
            None,
        ));
        let input = rig.upload("track.wav", b"RIFF");

        let report = rig
            .orchestrator(FixedEngine::new(""))
            .run(&Job::new(&input, Operation::SeparateVocals));

        let err = report.result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Separation);
        assert!(err.detail().contains("CUDA out of memory"));
        assert!(!rig.processed("mdx/track").exists());
        assert!(!input.exists());
        assert!(rig.work_dir_is_empty());

        let log = rig.settings.paths.logs_dir().join(format!("{}.log", report.job_id));
        assert!(logged(&log).contains("CUDA out of memory"));
    }

    #[test]
    fn conversion_failure_stops_before_separation() {
        let mut rig = Rig::new();
        let demucs_log = rig.log("demucs.log");
        rig.use_ffmpeg(failing_tool(&rig.bin(), "ffmpeg", 1, "Invalid data found"));
        rig.use_demucs(fake_demucs(&rig.bin(), DemucsBehavior::Separate, Some(&demucs_log)));
        let input = rig.upload("broken.mp3", b"junk");

        let err = rig
            .orchestrator(FixedEngine::new(""))
            .process(&Job::new(&input, Operation::SeparateVocals))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conversion);
        assert!(!demucs_log.exists());
        assert!(!input.exists());
    }

    #[test]
    fn slow_separator_times_out_and_cleans_up() {
        let mut rig = Rig::new();
        rig.use_demucs(fake_demucs(
            &rig.bin(),
            DemucsBehavior::HangAfterPartialOutput,
            None,
        ));
        let input = rig.upload("track.wav", b"RIFF");

        let orchestrator = Orchestrator::new(
            rig.settings.clone(),
            ToolRunner::new(2, Some(Duration::from_millis(500))),
            SharedTranscriber::new(FixedEngine::new("")),
        );
        let report = orchestrator.run(&Job::new(&input, Operation::SeparateVocals));

        assert_eq!(report.status, JobStatus::Failed(ErrorKind::Timeout));
        assert!(!input.exists());
        assert!(report.cleanup.removed.contains(&rig.processed("mdx/track")));
        assert!(!rig.processed("mdx/track").exists());
        assert!(rig.work_dir_is_empty());
        assert!(report.steps.completed.is_empty());
    }

    #[test]
    fn stem_can_be_reencoded_to_wav() {
        let mut rig = Rig::new();
        rig.settings.separation.convert_stem_to_wav = true;
        rig.use_ffmpeg(fake_ffmpeg(&rig.bin(), None));
        rig.use_demucs(fake_demucs(&rig.bin(), DemucsBehavior::Separate, None));
        let input = rig.upload("track.wav", b"RIFF");

        let output = rig
            .orchestrator(FixedEngine::new(""))
            .process(&Job::new(&input, Operation::SeparateVocals))
            .unwrap();

        let wav = rig.processed("track_no_vocals.wav");
        assert_eq!(output.stem_path(), Some(wav.as_path()));
        assert!(wav.exists());
        assert!(!rig.processed("track_no_vocals.mp3").exists());
    }

    /// Writes the nested tree itself instead of shelling out.
    struct InProcessSplitter;

    impl SeparationEngine for InProcessSplitter {
        fn model(&self) -> &str {
            "htdemucs"
        }

        fn output_format(&self) -> StemFormat {
            StemFormat::Wav
        }

        fn separate(&self, input: &Path, output_dir: &Path) -> SeparationResult<PathBuf> {
            let layout = self.layout(output_dir);
            let basename = input_basename(input);
            fs::create_dir_all(layout.job_dir(&basename)).unwrap();
            for stem in [Stem::Vocals, Stem::NoVocals] {
                fs::copy(input, layout.stem_path(&basename, stem)).unwrap();
            }
            Ok(output_dir.to_path_buf())
        }
    }

    #[test]
    fn replacement_separator_and_converter_are_used() {
        let mut rig = Rig::new();
        let ffmpeg_log = rig.log("ffmpeg.log");
        rig.use_ffmpeg(failing_tool(&rig.bin(), "ffmpeg", 1, "configured ffmpeg"));
        rig.use_demucs(failing_tool(&rig.bin(), "demucs", 1, "configured demucs"));
        let input = rig.upload("song.mp3", b"ID3");

        let alt_bin = rig.dir.path().join("alt");
        fs::create_dir_all(&alt_bin).unwrap();
        let runner = ToolRunner::from_settings(&rig.settings.tools);
        let converter = FormatConverter::new(
            fake_ffmpeg(&alt_bin, Some(&ffmpeg_log)),
            rig.settings.conversion.clone(),
            runner,
        );
        let output = rig
            .orchestrator(FixedEngine::new(""))
            .with_separator(InProcessSplitter)
            .with_converter(converter)
            .process(&Job::new(&input, Operation::SeparateVocals))
            .unwrap();

        let stem = rig.processed("song_no_vocals.wav");
        assert_eq!(output.stem_path(), Some(stem.as_path()));
        assert!(stem.exists());
        assert!(logged(&ffmpeg_log).contains("song.mp3"));
        assert!(!rig.processed("htdemucs/song").exists());
        assert!(rig.processed("htdemucs").exists());
    }

    #[test]
    fn missing_input_is_setup_failure() {
        let rig = Rig::new();
        let input = rig.settings.paths.upload_dir().join("gone.wav");

        let report = rig
            .orchestrator(FixedEngine::new(""))
            .run(&Job::new(&input, Operation::Transcribe));

        assert_eq!(report.status, JobStatus::Failed(ErrorKind::Setup));
        assert!(report.cleanup.missing.contains(&input));
    }

    #[test]
    fn concurrent_jobs_do_not_touch_each_other() {
        let mut rig = Rig::new();
        rig.use_demucs(fake_demucs(&rig.bin(), DemucsBehavior::Separate, None));
        let orchestrator = rig.orchestrator(FixedEngine::new(""));
        let intake = UploadIntake::from_settings(&rig.settings);

        let jobs: Vec<Job> = (0..3)
            .map(|_| {
                intake
                    .stage_bytes(b"RIFF", "track.wav")
                    .unwrap()
                    .into_job(Operation::SeparateVocals)
            })
            .collect();

        let orchestrator = &orchestrator;
        let outputs: Vec<JobOutput> = std::thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .iter()
                .map(|job| scope.spawn(move || orchestrator.process(job).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (job, output) in jobs.iter().zip(&outputs) {
            let path = output.stem_path().unwrap();
            assert!(path.exists());
            assert!(path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(job.id().as_str()));
            assert!(!job.input_path().exists());
        }
        assert!(rig.work_dir_is_empty());
    }
}
