//! Transcription engine trait and the shared, serialized handle to it.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::TranscriptionResult;

/// One transcription call.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptionRequest<'a> {
    /// Decodable audio file.
    pub audio: &'a Path,
    /// Language code passed to the model (e.g. "pl", "en").
    pub language: &'a str,
    /// Job-owned directory the engine may write scratch files into.
    pub scratch_dir: &'a Path,
}

/// A loaded speech model.
///
/// `transcribe` takes `&mut self`: implementations may mutate decoder
/// state and are not required to be reentrant.
pub trait TranscriptionEngine: Send {
    /// Engine name (for logging).
    fn name(&self) -> &str;

    /// Whether the engine can only read speech-canonical WAV.
    fn requires_canonical_input(&self) -> bool {
        false
    }

    /// Recognize the speech in `request.audio`.
    ///
    /// An empty string is a valid result for silent input.
    fn transcribe(&mut self, request: &TranscriptionRequest<'_>) -> TranscriptionResult<String>;
}

/// Process-wide handle to a single engine instance.
///
/// Clones share the engine; calls are serialized by a mutex so concurrent
/// jobs never run inference on the same model at once.
#[derive(Clone)]
pub struct SharedTranscriber {
    engine: Arc<Mutex<Box<dyn TranscriptionEngine>>>,
    name: String,
    requires_canonical: bool,
}

impl SharedTranscriber {
    pub fn new(engine: impl TranscriptionEngine + 'static) -> Self {
        let name = engine.name().to_string();
        let requires_canonical = engine.requires_canonical_input();
        Self {
            engine: Arc::new(Mutex::new(Box::new(engine))),
            name,
            requires_canonical,
        }
    }

    pub fn engine_name(&self) -> &str {
        &self.name
    }

    pub fn requires_canonical_input(&self) -> bool {
        self.requires_canonical
    }

    /// Run one transcription, waiting for any call already in progress.
    pub fn transcribe(&self, request: &TranscriptionRequest<'_>) -> TranscriptionResult<String> {
        let mut engine = self.engine.lock();
        tracing::debug!(
            "{} transcribing {} (language {})",
            self.name,
            request.audio.display(),
            request.language
        );
        engine.transcribe(request)
    }
}

impl std::fmt::Debug for SharedTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTranscriber")
            .field("engine", &self.name)
            .field("requires_canonical", &self.requires_canonical)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Fails if two calls ever overlap.
    struct ExclusiveEngine {
        active: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    impl TranscriptionEngine for ExclusiveEngine {
        fn name(&self) -> &str {
            "exclusive"
        }

        fn transcribe(&mut self, request: &TranscriptionRequest<'_>) -> TranscriptionResult<String> {
            assert_eq!(self.active.fetch_add(1, Ordering::SeqCst), 0);
            thread::sleep(Duration::from_millis(10));
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("{}:{}", request.language, request.audio.display()))
        }
    }

    #[test]
    fn concurrent_calls_are_serialized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let shared = SharedTranscriber::new(ExclusiveEngine {
            active: Arc::new(AtomicUsize::new(0)),
            calls: Arc::clone(&calls),
        });

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let audio = format!("clip{}.wav", i);
                    shared
                        .transcribe(&TranscriptionRequest {
                            audio: Path::new(&audio),
                            language: "en",
                            scratch_dir: Path::new("."),
                        })
                        .unwrap()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), format!("en:clip{}.wav", i));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn shared_handle_reports_engine_traits() {
        let shared = SharedTranscriber::new(ExclusiveEngine {
            active: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        });
        assert_eq!(shared.engine_name(), "exclusive");
        assert!(!shared.requires_canonical_input());
    }
}
