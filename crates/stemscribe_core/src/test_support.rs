//! Fixtures shared by unit tests: stand-in tool scripts and sandboxed settings.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::conversion::FormatConverter;
use crate::orchestrator::Services;
use crate::separation::{DemucsSeparator, OutputLocator};
use crate::tools::ToolRunner;
use crate::transcription::{
    SharedTranscriber, TranscriptionEngine, TranscriptionRequest, TranscriptionResult,
};

/// Write an executable `/bin/sh` script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

/// A tool that prints `stderr` and exits with `code`.
pub fn failing_tool(dir: &Path, name: &str, code: i32, stderr: &str) -> PathBuf {
    write_script(
        dir,
        name,
        &format!("echo '{}' 1>&2\nexit {}\n", stderr, code),
    )
}

/// Stand-in ffmpeg: copies the `-i` input to the last argument.
///
/// When `log` is given, each input path is appended to it.
pub fn fake_ffmpeg(dir: &Path, log: Option<&Path>) -> PathBuf {
    let record = log
        .map(|l| format!("echo \"$in\" >> '{}'\n", l.display()))
        .unwrap_or_default();
    write_script(
        dir,
        "ffmpeg",
        &format!(
            r#"in=""
while [ $# -gt 1 ]; do
  if [ "$1" = "-i" ]; then in="$2"; fi
  shift
done
{record}cp "$in" "$1"
"#
        ),
    )
}

/// How the stand-in demucs behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemucsBehavior {
    /// Write both stems under `<out>/<model>/<basename>/`.
    Separate,
    /// Exit 0 without writing anything.
    SilentSuccess,
    /// Write a partial tree, then exit non-zero.
    CrashAfterPartialOutput,
    /// Write a partial tree, then hang in a child process.
    HangAfterPartialOutput,
}

/// Stand-in demucs following the real tool's argument template and
/// nested output convention.
///
/// When `log` is given, each input path is appended to it.
pub fn fake_demucs(dir: &Path, behavior: DemucsBehavior, log: Option<&Path>) -> PathBuf {
    let record = log
        .map(|l| format!("echo \"$input\" >> '{}'\n", l.display()))
        .unwrap_or_default();
    let action = match behavior {
        DemucsBehavior::Separate => {
            r#"mkdir -p "$out/$model/$name"
cp "$input" "$out/$model/$name/vocals.$ext"
cp "$input" "$out/$model/$name/no_vocals.$ext"
"#
        }
        DemucsBehavior::SilentSuccess => "exit 0\n",
        DemucsBehavior::HangAfterPartialOutput => {
            r#"mkdir -p "$out/$model/$name"
cp "$input" "$out/$model/$name/vocals.$ext"
sleep 10
"#
        }
        DemucsBehavior::CrashAfterPartialOutput => {
            r#"mkdir -p "$out/$model/$name"
cp "$input" "$out/$model/$name/vocals.$ext"
echo 'RuntimeError: CUDA out of memory' 1>&2
exit 1
"#
        }
    };
    write_script(
        dir,
        "demucs",
        &format!(
            r#"model=""; out=""; ext=wav
while [ $# -gt 1 ]; do
  case "$1" in
    -n) model="$2"; shift ;;
    -o) out="$2"; shift ;;
    --mp3) ext=mp3 ;;
  esac
  shift
done
input="$1"
name=$(basename "$input")
name="${{name%.*}}"
{record}{action}"#
        ),
    )
}

/// Stand-in whisper CLI: writes `<output_dir>/<basename>.json` the way
/// `--output_format json` does, one entry per segment plus the joined text.
pub fn fake_whisper(dir: &Path, segments: &[&str]) -> PathBuf {
    let text: String = segments.iter().map(|s| format!(" {s}")).collect();
    let body = serde_json::json!({
        "text": text,
        "segments": segments
            .iter()
            .enumerate()
            .map(|(id, s)| serde_json::json!({ "id": id, "text": format!(" {s}") }))
            .collect::<Vec<_>>(),
        "language": "pl",
    });
    write_script(
        dir,
        "whisper",
        &format!(
            r#"input="$1"; out="."
while [ $# -gt 0 ]; do
  if [ "$1" = "--output_dir" ]; then out="$2"; fi
  shift
done
name=$(basename "$input")
name="${{name%.*}}"
cat > "$out/$name.json" <<'JSON'
{body}
JSON
"#
        ),
    )
}

/// Write a short silent 16-bit PCM WAV.
pub fn write_wav(path: &Path, channels: u16, sample_rate: u32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..(sample_rate / 10) * channels as u32 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Settings with every folder under `root` and fast-failing defaults.
pub fn sandbox_settings(root: &Path) -> Settings {
    let mut settings = Settings::default();
    let sub = |name: &str| root.join(name).display().to_string();
    settings.paths.upload_folder = sub("uploads");
    settings.paths.processed_folder = sub("static/processed");
    settings.paths.work_folder = sub("work");
    settings.paths.logs_folder = sub("logs");
    settings.tools.ffmpeg = "/nonexistent/ffmpeg".to_string();
    settings.tools.demucs = "/nonexistent/demucs".to_string();
    settings.tools.whisper = "/nonexistent/whisper".to_string();
    settings.logging.show_timestamps = false;
    for dir in [
        settings.paths.upload_dir(),
        settings.paths.processed_dir(),
        settings.paths.work_dir(),
        settings.paths.logs_dir(),
    ] {
        fs::create_dir_all(dir).unwrap();
    }
    settings
}

/// Engine that returns fixed text and counts its calls.
pub struct FixedEngine {
    pub text: String,
    pub calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl FixedEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: Default::default(),
        }
    }
}

impl TranscriptionEngine for FixedEngine {
    fn name(&self) -> &str {
        "fixed"
    }

    fn transcribe(&mut self, _request: &TranscriptionRequest<'_>) -> TranscriptionResult<String> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Adapters built from `settings`, with a fixed-text transcriber.
pub fn services(settings: &Settings) -> Services {
    let runner = ToolRunner::from_settings(&settings.tools);
    Services {
        converter: FormatConverter::from_settings(settings, runner.clone()),
        transcriber: SharedTranscriber::new(FixedEngine::new("hello")),
        separator: Box::new(DemucsSeparator::from_settings(settings, runner)),
        locator: OutputLocator::new(),
    }
}
