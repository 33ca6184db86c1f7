//! Session orchestrator
//!
//! Ties speech recognition, the model boundary, the reveal controller and
//! the speech sequencer into one tutoring session. All mutable session
//! state lives behind a single lock with this module as the only writer;
//! the lock is never held across an await.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use tutor_agent_config::Settings;
use tutor_agent_core::{
    CancelSource, ConnectionState, ConversationHistory, Error, Language, ParsedResponse,
    RecognizerEvent, Result, SolutionStep, SpeechOutcome, SpeechRecognizer, SpeechSynthesizer,
    VoiceConfig, FALLBACK_SPEECH,
};
use tutor_agent_llm::{build_explain_prompt, extract, LlmBackend, LlmError, Message, SYSTEM_PROMPT};
use tutor_agent_speech::{split_paragraphs, SpeechSequencer};
use tutor_agent_text_processing::{strip_markup, LanguageDetector};

use crate::events::SessionEvent;
use crate::reveal::RevealController;

const EVENT_CAPACITY: usize = 64;
const RECOGNIZER_CHANNEL: usize = 32;

/// Broad explain detection; checked before the whiteboard is cleared so a
/// re-explain request never wipes the steps it refers to
static EXPLAIN_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(explain|re.?explain|समझाओ|समझाइए|फिर\s*से|again|once\s*more)").unwrap()
});

/// Optional step reference inside an explain request ("step 2", "चरण 3")
static STEP_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:step|चरण)\s*(\d+)").unwrap());

/// Mutable session state; one writer, guarded by one lock
struct SessionShared {
    connection: ConnectionState,
    history: ConversationHistory,
    last_steps: Vec<SolutionStep>,
    last_language: Language,
    mic_enabled: bool,
    listening: bool,
    thinking: bool,
    speaking: bool,
    input_transcript: String,
    output_transcript: String,
}

/// One interactive tutoring session
pub struct TutorSession {
    id: Uuid,
    settings: Settings,
    backend: Arc<dyn LlmBackend>,
    recognizer: Arc<dyn SpeechRecognizer>,
    sequencer: SpeechSequencer,
    reveal: Arc<RevealController>,
    detector: LanguageDetector,
    /// One token per model call; a superseding input invalidates the
    /// in-flight call so its reply is dropped on arrival
    question_cancel: CancelSource,
    shared: Mutex<SessionShared>,
    events: broadcast::Sender<SessionEvent>,
}

impl TutorSession {
    /// Create a session and spawn its recognizer event loop
    pub fn new(
        settings: Settings,
        backend: Arc<dyn LlmBackend>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        recognizer: Arc<dyn SpeechRecognizer>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (tx, rx) = mpsc::channel(RECOGNIZER_CHANNEL);
        recognizer.set_event_sink(tx);

        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            sequencer: SpeechSequencer::new(synthesizer, &settings.speech),
            reveal: RevealController::new(settings.reveal.clone()),
            detector: LanguageDetector::new(
                settings.language.devanagari_threshold,
                settings.language.marker_threshold,
            ),
            question_cancel: CancelSource::new(),
            shared: Mutex::new(SessionShared {
                connection: ConnectionState::Disconnected,
                history: ConversationHistory::new(settings.session.history_limit),
                last_steps: Vec::new(),
                last_language: Language::default(),
                mic_enabled: true,
                listening: false,
                thinking: false,
                speaking: false,
                input_transcript: String::new(),
                output_transcript: String::new(),
            }),
            backend,
            recognizer,
            settings,
            events,
        });

        tokio::spawn(Arc::clone(&session).recognizer_loop(rx));
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The reveal controller, for UI consumers to subscribe and query
    pub fn reveal(&self) -> &Arc<RevealController> {
        &self.reveal
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.lock().connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn is_listening(&self) -> bool {
        self.shared.lock().listening
    }

    pub fn is_thinking(&self) -> bool {
        self.shared.lock().thinking
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.lock().speaking
    }

    pub fn mic_enabled(&self) -> bool {
        self.shared.lock().mic_enabled
    }

    pub fn last_language(&self) -> Language {
        self.shared.lock().last_language
    }

    pub fn last_steps(&self) -> Vec<SolutionStep> {
        self.shared.lock().last_steps.clone()
    }

    /// Latest user text, interim or final
    pub fn input_transcript(&self) -> String {
        self.shared.lock().input_transcript.clone()
    }

    /// Text currently being spoken, empty while silent
    pub fn output_transcript(&self) -> String {
        self.shared.lock().output_transcript.clone()
    }

    /// Bring the session up: validate the credential and the recognition
    /// capability, greet, then start listening
    ///
    /// Failure is fatal to the attempt, never retried: the state lingers at
    /// `Error` briefly and reverts to `Disconnected`.
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        {
            let mut shared = self.shared.lock();
            if matches!(
                shared.connection,
                ConnectionState::Connected | ConnectionState::Connecting
            ) {
                return Ok(());
            }
            shared.connection = ConnectionState::Connecting;
        }
        self.emit(SessionEvent::StateChanged(ConnectionState::Connecting));

        if let Err(err) = self.settings.llm.require_api_key() {
            return self.fail_connect(Error::Config(err.to_string())).await;
        }
        if !self.recognizer.is_available() {
            return self
                .fail_connect(Error::Recognition(format!(
                    "speech recognition unavailable (engine: {})",
                    self.recognizer.engine_name()
                )))
                .await;
        }

        {
            let mut shared = self.shared.lock();
            shared.connection = ConnectionState::Connected;
            shared.history.clear();
            shared.last_steps.clear();
            shared.mic_enabled = true;
        }
        self.emit(SessionEvent::StateChanged(ConnectionState::Connected));
        tracing::info!(session = %self.id, model = %self.backend.model_name(), "session connected");

        let greeting = self.settings.session.greeting.clone();
        let language = self.last_language();
        self.speak_and_resume(&greeting, language).await;
        Ok(())
    }

    async fn fail_connect(self: &Arc<Self>, err: Error) -> Result<()> {
        tracing::error!(session = %self.id, error = %err, "connect failed");
        self.shared.lock().connection = ConnectionState::Error;
        self.emit(SessionEvent::StateChanged(ConnectionState::Error));

        let session = Arc::clone(self);
        let revert_after = self.settings.session.error_revert();
        tokio::spawn(async move {
            tokio::time::sleep(revert_after).await;
            let reverted = {
                let mut shared = session.shared.lock();
                if shared.connection == ConnectionState::Error {
                    shared.connection = ConnectionState::Disconnected;
                    true
                } else {
                    false
                }
            };
            if reverted {
                session.emit(SessionEvent::StateChanged(ConnectionState::Disconnected));
            }
        });
        Err(err)
    }

    /// Tear the session down, silencing speech and listening immediately
    pub fn disconnect(&self) {
        self.sequencer.interrupt();
        self.question_cancel.cancel_all();
        self.recognizer.stop();
        self.reveal.reset();
        {
            let mut shared = self.shared.lock();
            shared.connection = ConnectionState::Disconnected;
            shared.history.clear();
            shared.last_steps.clear();
            shared.listening = false;
            shared.thinking = false;
            shared.speaking = false;
            shared.input_transcript.clear();
            shared.output_transcript.clear();
        }
        self.emit(SessionEvent::StateChanged(ConnectionState::Disconnected));
        tracing::info!(session = %self.id, "session disconnected");
    }

    /// Process a typed message exactly like a final transcript
    pub async fn submit_text(self: &Arc<Self>, text: &str) -> Result<()> {
        self.sequencer.interrupt();
        self.set_speaking(false);
        self.process_input(text).await
    }

    /// Flip the microphone; off also halts the engine immediately
    pub fn toggle_microphone(&self) -> bool {
        let enabled = {
            let mut shared = self.shared.lock();
            shared.mic_enabled = !shared.mic_enabled;
            shared.mic_enabled
        };
        if enabled {
            if self.is_connected() {
                self.start_listening();
            }
        } else {
            self.recognizer.stop();
            self.set_listening(false);
        }
        enabled
    }

    /// Route one user input: explain requests go to the explain-only call,
    /// everything else becomes a fresh question
    async fn process_input(self: &Arc<Self>, text: &str) -> Result<()> {
        let t = text.trim();
        if t.is_empty() || !self.is_connected() {
            return Ok(());
        }
        tracing::debug!(session = %self.id, input = %t, "processing input");

        // Explain detection runs before the whiteboard is cleared
        if EXPLAIN_REQUEST.is_match(t) {
            let steps = self.shared.lock().last_steps.clone();
            if !steps.is_empty() {
                let focus = STEP_NUMBER
                    .captures(t)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse().ok());
                self.sequencer.interrupt();
                self.set_speaking(false);
                return self.request_explain(steps, focus).await;
            }
        }

        self.sequencer.interrupt();
        self.set_speaking(false);
        self.pause_listening();
        let run = self.question_cancel.issue();

        let language = self.detector.detect(t);
        {
            let mut shared = self.shared.lock();
            shared.last_language = language;
            shared.last_steps.clear();
            shared.input_transcript = t.to_string();
        }
        self.reveal.reset();
        self.emit(SessionEvent::WhiteboardCleared);
        self.set_thinking(true);

        let messages = self.build_messages(t);
        let result = self
            .backend
            .complete(&messages, self.settings.llm.max_tokens)
            .await;
        if run.is_cancelled() {
            // Superseded while waiting; the newer run owns the flags now
            return Ok(());
        }
        self.set_thinking(false);

        match result {
            Ok(raw) => {
                let parsed = extract(&raw);
                self.record_exchange(t, &parsed);

                if parsed.steps.is_empty() {
                    self.speak_and_resume(&parsed.speech, language).await;
                } else {
                    {
                        let mut shared = self.shared.lock();
                        shared.last_steps = parsed.steps.clone();
                    }
                    self.emit(SessionEvent::StepsPublished(parsed.steps.clone()));

                    let reveal = Arc::clone(&self.reveal);
                    let steps = parsed.steps;
                    tokio::spawn(async move { reveal.reveal(steps).await });

                    self.speak_and_resume(&parsed.speech, language).await;
                }
            }
            Err(err) => {
                tracing::error!(session = %self.id, error = %err, "model call failed");
                let apology = apology_for(&err, language);
                self.speak_and_resume(apology, language).await;
            }
        }
        Ok(())
    }

    /// Explain the given steps verbally, optionally focused on one step
    ///
    /// Scoped strictly to the steps passed in; the reply's own steps are
    /// discarded, so the whiteboard is never repopulated.
    pub async fn request_explain(
        self: &Arc<Self>,
        steps: Vec<SolutionStep>,
        focus_step: Option<u32>,
    ) -> Result<()> {
        if steps.is_empty() || !self.is_connected() {
            return Ok(());
        }
        let language = self.last_language();

        self.sequencer.interrupt();
        self.set_speaking(false);
        self.pause_listening();
        let run = self.question_cancel.issue();
        self.set_thinking(true);

        let prompt = build_explain_prompt(&steps, language, focus_step);
        let result = self
            .backend
            .complete(&[Message::user(prompt)], self.settings.llm.explain_max_tokens)
            .await;
        if run.is_cancelled() {
            return Ok(());
        }
        self.set_thinking(false);

        let speech = match result {
            Ok(raw) => {
                let parsed = extract(&raw);
                // Returned steps are discarded by contract
                if parsed.speech == FALLBACK_SPEECH {
                    build_step_speech("Let me walk you through this.", &steps, language)
                } else {
                    parsed.speech
                }
            }
            Err(err) => {
                tracing::error!(session = %self.id, error = %err, "explain call failed");
                build_step_speech("Let me walk you through the solution.", &steps, language)
            }
        };

        self.speak_and_resume(&speech, language).await;
        Ok(())
    }

    /// Viewport scroll notification, forwarded to the reveal controller
    pub fn note_scroll(&self, distance_from_bottom_px: u32) {
        self.reveal.note_scroll(distance_from_bottom_px);
    }

    fn build_messages(&self, user_text: &str) -> Vec<Message> {
        let shared = self.shared.lock();
        let mut messages = Vec::with_capacity(shared.history.len() + 2);
        messages.push(Message::system(SYSTEM_PROMPT));
        for turn in shared.history.iter() {
            messages.push(Message {
                role: match turn.role {
                    tutor_agent_core::TurnRole::User => tutor_agent_llm::Role::User,
                    tutor_agent_core::TurnRole::Assistant => tutor_agent_llm::Role::Assistant,
                    tutor_agent_core::TurnRole::System => tutor_agent_llm::Role::System,
                },
                content: turn.content.clone(),
            });
        }
        messages.push(Message::user(user_text));
        messages
    }

    /// Record the exchange with a step summary instead of the raw reply,
    /// so follow-ups get context without LaTeX pollution
    fn record_exchange(&self, user_text: &str, parsed: &ParsedResponse) {
        let summary = if parsed.steps.is_empty() {
            format!("Answered: \"{user_text}\"")
        } else {
            let labels = parsed
                .steps
                .iter()
                .map(|s| format!("Step {}: {}", s.step, s.label))
                .collect::<Vec<_>>()
                .join(", ");
            format!("Explained \"{user_text}\" with steps: {labels}")
        };
        self.shared.lock().history.push_exchange(user_text, summary);
    }

    /// Speak text as a paragraph sequence; listening resumes only after a
    /// natural completion, never after an interruption
    async fn speak_and_resume(self: &Arc<Self>, text: &str, language: Language) {
        let paragraphs = split_paragraphs(text);
        if paragraphs.is_empty() {
            self.resume_listening();
            return;
        }
        let voice = VoiceConfig::for_language(language);

        self.shared.lock().output_transcript = text.to_string();
        self.set_speaking(true);
        let outcome = self.sequencer.speak_sequence(&paragraphs, &voice).await;
        self.set_speaking(false);
        self.shared.lock().output_transcript.clear();

        if outcome == SpeechOutcome::Completed {
            self.resume_listening();
        }
    }

    fn start_listening(&self) {
        let tag = self.last_language().bcp47();
        match self.recognizer.start(tag) {
            Ok(()) => {
                self.set_listening(true);
            }
            Err(err) => {
                tracing::warn!(session = %self.id, error = %err, "could not start listening");
            }
        }
    }

    fn resume_listening(&self) {
        let should = {
            let shared = self.shared.lock();
            shared.connection == ConnectionState::Connected
                && shared.mic_enabled
                && !shared.listening
        };
        if should {
            self.start_listening();
        }
    }

    fn pause_listening(&self) {
        let was_listening = {
            let mut shared = self.shared.lock();
            std::mem::take(&mut shared.listening)
        };
        if was_listening {
            self.recognizer.stop();
            self.emit(SessionEvent::ListeningChanged(false));
        }
    }

    async fn recognizer_loop(self: Arc<Self>, mut rx: mpsc::Receiver<RecognizerEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                RecognizerEvent::Partial(text) => {
                    // Barge-in: any speech kills playback instantly
                    if self.is_speaking() {
                        self.sequencer.interrupt();
                        self.set_speaking(false);
                    } else {
                        self.shared.lock().input_transcript = text.clone();
                    }
                    self.emit(SessionEvent::InterimTranscript(text));
                }
                RecognizerEvent::Final(text) => {
                    self.sequencer.interrupt();
                    self.set_speaking(false);
                    self.question_cancel.cancel_all();
                    self.emit(SessionEvent::FinalTranscript(text.clone()));
                    // Processing runs on its own task; the loop stays free
                    // to cancel whatever that task starts speaking
                    let session = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(err) = session.process_input(&text).await {
                            tracing::error!(session = %session.id, error = %err, "transcript processing failed");
                        }
                    });
                }
                RecognizerEvent::Error(err) => {
                    self.set_listening(false);
                    if err.is_benign() {
                        tracing::debug!(session = %self.id, ?err, "recognizer quiet period");
                    } else {
                        tracing::warn!(session = %self.id, ?err, "recognizer error");
                    }
                }
                RecognizerEvent::Ended => {
                    self.set_listening(false);
                    // Restart off the loop; the mic must come back even
                    // while a reply is pending or speaking so live speech
                    // can barge in
                    if self.is_connected() && self.mic_enabled() {
                        let session = Arc::clone(&self);
                        tokio::spawn(async move {
                            tokio::time::sleep(session.settings.session.listen_restart()).await;
                            let should = {
                                let shared = session.shared.lock();
                                shared.connection == ConnectionState::Connected
                                    && shared.mic_enabled
                                    && !shared.listening
                            };
                            if should {
                                session.start_listening();
                            }
                        });
                    }
                }
            }
        }
        tracing::debug!(session = %self.id, "recognizer event stream closed");
    }

    fn set_listening(&self, value: bool) {
        let changed = {
            let mut shared = self.shared.lock();
            let changed = shared.listening != value;
            shared.listening = value;
            changed
        };
        if changed {
            self.emit(SessionEvent::ListeningChanged(value));
        }
    }

    fn set_thinking(&self, value: bool) {
        self.shared.lock().thinking = value;
        self.emit(SessionEvent::ThinkingChanged(value));
    }

    fn set_speaking(&self, value: bool) {
        let changed = {
            let mut shared = self.shared.lock();
            let changed = shared.speaking != value;
            shared.speaking = value;
            changed
        };
        if changed {
            self.emit(SessionEvent::SpeakingChanged(value));
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

/// Spoken apology matching the failure class and the turn's language
fn apology_for(err: &LlmError, language: Language) -> &'static str {
    match (err, language) {
        (LlmError::RateLimited(_), Language::English) => {
            "Quota exceeded, please wait a moment."
        }
        (LlmError::RateLimited(_), Language::Hindi) => {
            "अभी बहुत ज़्यादा requests हैं, थोड़ा रुक कर फिर try करो।"
        }
        (_, Language::English) => "Sorry, something went wrong. Please try again.",
        (_, Language::Hindi) => "माफ़ करना, कुछ गड़बड़ हो गई। फिर से try करो।",
    }
}

/// Local walkthrough spoken when an explain call yields nothing usable
///
/// Reads the step labels plus any plain-text lines, skipping formula-only
/// lines entirely.
fn build_step_speech(intro: &str, steps: &[SolutionStep], language: Language) -> String {
    let count = steps.len();
    let parts: Vec<String> = steps
        .iter()
        .enumerate()
        .map(|(idx, s)| {
            let text_lines: Vec<String> = s
                .lines
                .iter()
                .filter(|l| !l.trim().starts_with("$$") && !l.trim().is_empty())
                .map(|l| strip_markup(l))
                .filter(|l| !l.is_empty())
                .collect();

            let transition = match language {
                Language::Hindi => {
                    if idx == 0 {
                        format!("पहला step है: {}.", s.label)
                    } else if idx == count - 1 {
                        format!("और अब आखिरी step: {}.", s.label)
                    } else {
                        format!("अब step {}: {}.", s.step, s.label)
                    }
                }
                Language::English => {
                    if idx == 0 {
                        format!("Let's start, step {} is {}.", s.step, s.label)
                    } else if idx == count - 1 {
                        format!("And finally, step {}: {}.", s.step, s.label)
                    } else {
                        format!("Step {}: {}.", s.step, s.label)
                    }
                }
            };

            if text_lines.is_empty() {
                transition
            } else {
                format!("{} {}", transition, text_lines.join(" "))
            }
        })
        .collect();

    format!("{}  {}", intro, parts.join("  "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_request_detection() {
        assert!(EXPLAIN_REQUEST.is_match("explain step 2"));
        assert!(EXPLAIN_REQUEST.is_match("Re-explain that"));
        assert!(EXPLAIN_REQUEST.is_match("reexplain"));
        assert!(EXPLAIN_REQUEST.is_match("again please"));
        assert!(EXPLAIN_REQUEST.is_match("once more"));
        assert!(EXPLAIN_REQUEST.is_match("समझाओ"));
        assert!(EXPLAIN_REQUEST.is_match("फिर से समझाओ"));
        // Anchored at the start: mentioning "explain" later is a question
        assert!(!EXPLAIN_REQUEST.is_match("can you explain derivatives"));
    }

    #[test]
    fn test_step_number_extraction() {
        let focus = |t: &str| {
            STEP_NUMBER
                .captures(t)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        };
        assert_eq!(focus("explain step 2"), Some(2));
        assert_eq!(focus("समझाओ चरण 3"), Some(3));
        assert_eq!(focus("explain again"), None);
    }

    #[test]
    fn test_build_step_speech_english() {
        let steps = vec![
            SolutionStep::new(1, "Factor", vec!["$$x^2$$".into(), "Find the roots".into()]),
            SolutionStep::new(2, "Solve", vec!["$$x = 4$$".into()]),
        ];
        let speech = build_step_speech("Let me walk you through this.", &steps, Language::English);
        assert!(speech.starts_with("Let me walk you through this."));
        assert!(speech.contains("step 1 is Factor"));
        assert!(speech.contains("Find the roots"));
        assert!(speech.contains("And finally, step 2: Solve."));
        // Formula-only lines never reach speech
        assert!(!speech.contains('$'));
    }

    #[test]
    fn test_build_step_speech_hindi_transitions() {
        let steps = vec![
            SolutionStep::new(1, "Setup", vec![]),
            SolutionStep::new(2, "Middle", vec![]),
            SolutionStep::new(3, "Answer", vec![]),
        ];
        let speech = build_step_speech("चलो शुरू करते हैं।", &steps, Language::Hindi);
        assert!(speech.contains("पहला step है: Setup."));
        assert!(speech.contains("अब step 2: Middle."));
        assert!(speech.contains("और अब आखिरी step: Answer."));
    }

    #[test]
    fn test_apologies_distinguish_rate_limit() {
        let rate = LlmError::RateLimited("429".into());
        let other = LlmError::Network("boom".into());
        assert!(apology_for(&rate, Language::English).contains("Quota"));
        assert_ne!(
            apology_for(&rate, Language::English),
            apology_for(&other, Language::English)
        );
    }
}
