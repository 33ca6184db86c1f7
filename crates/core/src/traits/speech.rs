//! Speech capability traits

use crate::{SpeechOutcome, VoiceConfig};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Speech synthesis interface
///
/// One utterance at a time; the sequencer owns ordering and pacing. The
/// engine must support an immediate global cancel that makes the in-flight
/// utterance resolve [`SpeechOutcome::Interrupted`], never `Completed` —
/// resolving `Completed` after a cancel would let the sequencer advance to
/// the next chunk after being told to stop.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Speak one chunk of plain text, resolving when the utterance ends
    ///
    /// # Returns
    /// - `Completed` — the utterance finished naturally
    /// - `Interrupted` — a global cancel stopped it mid-flight
    /// - `Failed` — genuine synthesis failure
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> SpeechOutcome;

    /// Immediately cancel the in-flight utterance, if any
    fn cancel(&self);

    /// Engine name for logging
    fn engine_name(&self) -> &str;
}

/// Error class reported by the recognition engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerError {
    /// Nothing was said; expected during quiet periods
    NoSpeech,
    /// Listening was stopped on purpose
    Aborted,
    /// Anything else
    Other(String),
}

impl RecognizerError {
    /// Benign errors are not logged as real errors
    pub fn is_benign(&self) -> bool {
        matches!(self, RecognizerError::NoSpeech | RecognizerError::Aborted)
    }
}

/// Events emitted by the recognition engine
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// Partial transcript; may be revised
    Partial(String),
    /// Final transcript for the current utterance
    Final(String),
    /// Engine error (see [`RecognizerError::is_benign`])
    Error(RecognizerError),
    /// Listening ended; the session auto-restarts it while connected with
    /// the microphone enabled
    Ended,
}

/// Speech recognition interface
///
/// Continuous listening with interim results, consumed as an event stream.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync + 'static {
    /// Whether the capability exists in this runtime; checked at connect
    /// time and fatal when absent
    fn is_available(&self) -> bool;

    /// Route engine events into the given channel
    fn set_event_sink(&self, tx: mpsc::Sender<RecognizerEvent>);

    /// Start continuous listening with interim results
    fn start(&self, language_tag: &str) -> crate::Result<()>;

    /// Stop listening; emits `Ended`
    fn stop(&self);

    /// Engine name for logging
    fn engine_name(&self) -> &str;
}
