//! Rendering job results and failures for the terminal.

use serde_json::json;
use stemscribe_core::models::{ErrorKind, JobOutput};

/// Text printed to stdout for a finished job.
pub fn render_output(output: &JobOutput, as_json: bool) -> String {
    match (output, as_json) {
        (JobOutput::Transcript(text), true) => json!({ "transcription": text }).to_string(),
        (JobOutput::Transcript(text), false) => text.clone(),
        (JobOutput::Stem { path, .. }, true) => {
            json!({ "audio_path": path.display().to_string() }).to_string()
        }
        (JobOutput::Stem { path, .. }, false) => path.display().to_string(),
    }
}

/// Text printed to stderr for a failed job.
pub fn render_error(kind: ErrorKind, detail: &str, as_json: bool) -> String {
    if as_json {
        json!({ "error": detail, "kind": kind.name() }).to_string()
    } else {
        format!("Error ({}): {}", kind.name(), detail)
    }
}

/// Process exit code for a failure category.
pub fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Setup => 1,
        ErrorKind::Intake => 3,
        ErrorKind::Conversion => 4,
        ErrorKind::Transcription => 5,
        ErrorKind::Separation => 6,
        ErrorKind::MissingOutput => 7,
        ErrorKind::Timeout => 8,
    }
}
