//! stemscribe - run one audio job from the command line.
//!
//! Stages the input file the way an upload handler would, runs the job,
//! and prints the transcript or the path of the separated stem.

mod cli;
mod output;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use stemscribe_core::config::ConfigManager;
use stemscribe_core::intake::UploadIntake;
use stemscribe_core::logging::init_tracing_with_file;
use stemscribe_core::models::ErrorKind;
use stemscribe_core::orchestrator::Orchestrator;

use cli::Cli;
use output::{exit_code, render_error, render_output};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(ErrorKind::Setup))
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut manager = ConfigManager::new(&cli.config);
    manager
        .load_or_create()
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;
    manager
        .ensure_dirs_exist()
        .context("failed to create working folders")?;
    let settings = manager.into_settings();

    let _guard = init_tracing_with_file(settings.logging.level, &settings.paths.logs_dir());
    tracing::debug!(?cli, "parsed arguments");

    let intake = UploadIntake::from_settings(&settings);
    let orchestrator =
        Orchestrator::from_settings(settings).context("failed to set up transcription engine")?;

    let file = cli.command.file();
    let original_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let staged = match intake.stage_file(file, &original_name) {
        Ok(staged) => staged,
        Err(e) => {
            eprintln!("{}", render_error(ErrorKind::Intake, &e.to_string(), cli.json));
            return Ok(ExitCode::from(exit_code(ErrorKind::Intake)));
        }
    };

    let mut job = staged.into_job(cli.command.operation());
    if let Some(language) = cli.command.language() {
        job = job.with_language(language);
    }

    match orchestrator.process(&job) {
        Ok(output) => {
            println!("{}", render_output(&output, cli.json));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", render_error(e.kind(), &e.detail(), cli.json));
            Ok(ExitCode::from(exit_code(e.kind())))
        }
    }
}
