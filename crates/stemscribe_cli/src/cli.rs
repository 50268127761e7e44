//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stemscribe_core::models::Operation;

#[derive(Debug, Parser)]
#[command(name = "stemscribe")]
#[command(about = "Transcribe speech or remove vocals from an audio file")]
#[command(version)]
pub struct Cli {
    /// Settings file (created with defaults if missing)
    #[arg(short, long, default_value = ".config/settings.toml")]
    pub config: PathBuf,

    /// Print the result or error as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transcribe speech in an MP3 or WAV file
    Transcribe {
        /// Input audio file
        file: PathBuf,

        /// Language code (default: from settings)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Remove vocals, keeping the instrumental stem
    Separate {
        /// Input audio file
        file: PathBuf,
    },
}

impl Commands {
    pub fn file(&self) -> &PathBuf {
        match self {
            Self::Transcribe { file, .. } | Self::Separate { file } => file,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Transcribe { .. } => Operation::Transcribe,
            Self::Separate { .. } => Operation::SeparateVocals,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            Self::Transcribe { language, .. } => language.as_deref(),
            Self::Separate { .. } => None,
        }
    }
}
