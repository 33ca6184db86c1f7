//! Serial speech sequencing with cooperative cancellation
//!
//! One sequence plays at a time. Interruption advances a generation
//! counter, so a superseded sequence observes its token as stale at the
//! next chunk boundary and stops without firing any completion path for
//! the chunks it skipped.

use std::sync::Arc;
use std::time::Duration;

use tutor_agent_config::SpeechSettings;
use tutor_agent_core::{CancelSource, SpeechOutcome, SpeechSynthesizer, VoiceConfig};
use tutor_agent_text_processing::strip_markup;

use crate::chunker::chunk_text;

/// Plays paragraphs of spoken text strictly in order
pub struct SpeechSequencer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cancel: CancelSource,
    chunk_limit: usize,
    inter_chunk_pause: Duration,
}

impl SpeechSequencer {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, settings: &SpeechSettings) -> Self {
        Self {
            synthesizer,
            cancel: CancelSource::new(),
            chunk_limit: settings.chunk_limit,
            inter_chunk_pause: Duration::from_millis(settings.inter_chunk_pause_ms),
        }
    }

    /// Speak paragraphs serially, pausing briefly between chunks
    ///
    /// Markup is stripped per paragraph before chunking; paragraphs that
    /// strip to nothing are skipped. Returns `Interrupted` as soon as the
    /// sequence's token goes stale, `Completed` on natural exhaustion of a
    /// non-empty queue (and for an empty queue), `Failed` only when every
    /// chunk failed to play.
    pub async fn speak_sequence(
        &self,
        paragraphs: &[String],
        voice: &VoiceConfig,
    ) -> SpeechOutcome {
        let chunks: Vec<String> = paragraphs
            .iter()
            .map(|p| strip_markup(p))
            .filter(|p| !p.is_empty())
            .flat_map(|p| chunk_text(&p, self.chunk_limit))
            .collect();

        if chunks.is_empty() {
            return SpeechOutcome::Completed;
        }

        let token = self.cancel.issue();
        let total = chunks.len();
        let mut played = 0usize;

        tracing::debug!(chunks = total, language = ?voice.language, "speech sequence start");

        for (idx, chunk) in chunks.iter().enumerate() {
            if token.is_cancelled() {
                tracing::debug!(at = idx, of = total, "speech sequence interrupted");
                return SpeechOutcome::Interrupted;
            }

            match self.synthesizer.speak(chunk, voice).await {
                SpeechOutcome::Completed => played += 1,
                SpeechOutcome::Interrupted => return SpeechOutcome::Interrupted,
                SpeechOutcome::Failed => {
                    // One bad utterance must not silence the rest
                    tracing::warn!(at = idx, of = total, "chunk failed to play, continuing");
                }
            }

            if idx + 1 < total {
                tokio::time::sleep(self.inter_chunk_pause).await;
                if token.is_cancelled() {
                    return SpeechOutcome::Interrupted;
                }
            }
        }

        if played == 0 {
            SpeechOutcome::Failed
        } else {
            SpeechOutcome::Completed
        }
    }

    /// Abort the current sequence and any in-flight utterance
    pub fn interrupt(&self) {
        self.cancel.cancel_all();
        self.synthesizer.cancel();
    }
}
