//! End-to-end session scenarios over mock capabilities

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use tutor_agent_agent::{RevealEvent, SessionEvent, TutorSession};
use tutor_agent_config::{RevealSettings, Settings, SpeechSettings};
use tutor_agent_core::{
    ConnectionState, Language, RecognizerEvent, Result, RevealPhase, SpeechOutcome,
    SpeechRecognizer, SpeechSynthesizer, VoiceConfig,
};
use tutor_agent_llm::{LlmBackend, LlmError, Message};

// ── Mocks ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockBackend {
    replies: Mutex<Vec<std::result::Result<String, LlmError>>>,
    calls: Mutex<Vec<(Vec<Message>, u32)>>,
    delay: Duration,
}

impl MockBackend {
    fn with_replies(replies: Vec<std::result::Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        })
    }

    fn delayed(replies: Vec<std::result::Result<String, LlmError>>, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(Vec::new()),
            delay: Duration::from_millis(delay_ms),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn last_call(&self) -> (Vec<Message>, u32) {
        self.calls.lock().last().cloned().unwrap()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(
        &self,
        messages: &[Message],
        max_tokens: u32,
    ) -> std::result::Result<String, LlmError> {
        self.calls.lock().push((messages.to_vec(), max_tokens));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut replies = self.replies.lock();
        if replies.is_empty() {
            return Err(LlmError::Api("no scripted reply".into()));
        }
        replies.remove(0)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

struct MockSynth {
    utterances: Mutex<Vec<(String, Language)>>,
    interrupted: Mutex<Vec<String>>,
    /// Bumped by cancel; an utterance that observes a bump resolves
    /// Interrupted, one started after the bump plays normally
    cancel_epoch: AtomicU64,
    /// Polling ticks per utterance; >0 gives interrupts a window to land
    ticks: u32,
}

impl MockSynth {
    fn with_ticks(ticks: u32) -> Arc<Self> {
        Arc::new(Self {
            utterances: Mutex::new(Vec::new()),
            interrupted: Mutex::new(Vec::new()),
            cancel_epoch: AtomicU64::new(0),
            ticks,
        })
    }

    fn instant() -> Arc<Self> {
        Self::with_ticks(0)
    }

    fn slow(ticks: u32) -> Arc<Self> {
        Self::with_ticks(ticks)
    }

    fn spoken(&self) -> Vec<(String, Language)> {
        self.utterances.lock().clone()
    }

    fn interrupted_texts(&self) -> Vec<String> {
        self.interrupted.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynth {
    async fn speak(&self, text: &str, voice: &VoiceConfig) -> SpeechOutcome {
        self.utterances
            .lock()
            .push((text.to_string(), voice.language));
        let epoch = self.cancel_epoch.load(Ordering::Acquire);
        for _ in 0..self.ticks {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if self.cancel_epoch.load(Ordering::Acquire) != epoch {
                self.interrupted.lock().push(text.to_string());
                return SpeechOutcome::Interrupted;
            }
        }
        SpeechOutcome::Completed
    }

    fn cancel(&self) {
        self.cancel_epoch.fetch_add(1, Ordering::AcqRel);
    }

    fn engine_name(&self) -> &str {
        "mock-synth"
    }
}

struct MockRecognizer {
    available: bool,
    sink: Mutex<Option<mpsc::Sender<RecognizerEvent>>>,
    started_with: Mutex<Vec<String>>,
    stops: Mutex<u32>,
}

impl MockRecognizer {
    fn new(available: bool) -> Arc<Self> {
        Arc::new(Self {
            available,
            sink: Mutex::new(None),
            started_with: Mutex::new(Vec::new()),
            stops: Mutex::new(0),
        })
    }

    async fn push(&self, event: RecognizerEvent) {
        let sink = self.sink.lock().clone();
        if let Some(sink) = sink {
            sink.send(event).await.ok();
        }
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn set_event_sink(&self, tx: mpsc::Sender<RecognizerEvent>) {
        *self.sink.lock() = Some(tx);
    }

    fn start(&self, language_tag: &str) -> Result<()> {
        self.started_with.lock().push(language_tag.to_string());
        Ok(())
    }

    fn stop(&self) {
        *self.stops.lock() += 1;
    }

    fn engine_name(&self) -> &str {
        "mock-recognizer"
    }
}

// ── Fixtures ───────────────────────────────────────────────────────────

fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_settings() -> Settings {
    init_logs();
    let mut settings = Settings::default();
    settings.llm.api_key = "gsk_test".to_string();
    settings.speech = SpeechSettings {
        chunk_limit: 180,
        inter_chunk_pause_ms: 1,
    };
    settings.reveal = RevealSettings {
        step_base_delay_ms: 1,
        per_line_delay_ms: 1,
        settle_delay_ms: 1,
        scroll_threshold_px: 80,
    };
    settings.session.error_revert_ms = 30;
    settings.session.listen_restart_ms = 1;
    settings
}

fn four_step_reply() -> String {
    serde_json::json!({
        "speech": "This is a linear equation, so we isolate x step by step.",
        "steps": [
            {"step": 1, "label": "Write the Equation", "lines": ["$$2x + 3 = 11$$"]},
            {"step": 2, "label": "Subtract 3", "lines": ["$$2x = 8$$"]},
            {"step": 3, "label": "Divide by 2", "lines": ["$$x = 4$$"]},
            {"step": 4, "label": "Answer", "lines": ["$$\\boxed{x = 4}$$"]}
        ]
    })
    .to_string()
}

async fn drain_until_idle() {
    // Give spawned reveal/restart tasks a chance to run
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// ── Scenarios ──────────────────────────────────────────────────────────

#[tokio::test]
async fn english_question_reveals_four_steps_and_speaks() {
    let backend = MockBackend::with_replies(vec![Ok(four_step_reply())]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(
        fast_settings(),
        backend.clone(),
        synth.clone(),
        recognizer.clone(),
    );

    session.connect().await.unwrap();
    assert_eq!(session.connection_state(), ConnectionState::Connected);

    let mut reveal_events = session.reveal().subscribe();
    session.submit_text("Solve 2x + 3 = 11").await.unwrap();
    drain_until_idle().await;

    // Whiteboard: four steps revealed in order, ending Ready
    let state = session.reveal().snapshot();
    assert_eq!(state.phase, RevealPhase::Ready);
    assert_eq!(state.completed.len(), 4);
    assert_eq!(state.completed[0].label, "Write the Equation");
    assert!(session.reveal().explain_ready());

    let mut seen = Vec::new();
    while let Ok(ev) = reveal_events.try_recv() {
        seen.push(ev);
    }
    assert!(seen.contains(&RevealEvent::StepStarted { step: 1 }));
    assert_eq!(seen.last(), Some(&RevealEvent::Ready));

    // Speech: greeting plus the reply, English voice, chunks within limit
    let spoken = synth.spoken();
    assert!(spoken.len() >= 2);
    assert_eq!(spoken[0].0, "Hello! What's your question?");
    assert!(spoken
        .iter()
        .any(|(text, _)| text.contains("linear equation")));
    for (text, language) in &spoken {
        assert!(text.chars().count() <= 180);
        assert_eq!(*language, Language::English);
    }

    // History carries a step summary, not raw JSON
    let (messages, _) = {
        session.submit_text("what about 3x?").await.unwrap();
        backend.last_call()
    };
    let assistant_turn = messages
        .iter()
        .find(|m| matches!(m.role, tutor_agent_llm::Role::Assistant))
        .expect("history should carry the assistant summary");
    assert!(assistant_turn.content.contains("Step 1: Write the Equation"));
    assert!(!assistant_turn.content.contains("$$"));
}

#[tokio::test]
async fn single_hinglish_marker_stays_english() {
    let backend = MockBackend::with_replies(vec![Ok(
        r#"{"speech":"Here is the answer.","steps":[]}"#.to_string(),
    )]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(fast_settings(), backend, synth.clone(), recognizer);

    session.connect().await.unwrap();
    // "karo" is the only marker word; one match is below the threshold
    session.submit_text("2x+3=11 hal karo").await.unwrap();

    assert_eq!(session.last_language(), Language::English);
    let spoken = synth.spoken();
    assert_eq!(spoken.last().unwrap().1, Language::English);
}

#[tokio::test]
async fn devanagari_input_switches_voice_to_hindi() {
    let backend = MockBackend::with_replies(vec![Ok(
        r#"{"speech":"उत्तर चार है।","steps":[]}"#.to_string(),
    )]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(fast_settings(), backend, synth.clone(), recognizer);

    session.connect().await.unwrap();
    session.submit_text("2x+3=11 हल करो").await.unwrap();

    assert_eq!(session.last_language(), Language::Hindi);
    assert_eq!(synth.spoken().last().unwrap().1, Language::Hindi);
}

#[tokio::test]
async fn explain_step_two_focuses_and_never_repopulates_whiteboard() {
    let explain_reply = serde_json::json!({
        "speech": "So first we write the equation down, and the key move is subtracting three from both sides.",
        "steps": [{"step": 9, "label": "Sneaky", "lines": ["$$nope$$"]}]
    })
    .to_string();
    let backend =
        MockBackend::with_replies(vec![Ok(four_step_reply()), Ok(explain_reply)]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(
        fast_settings(),
        backend.clone(),
        synth.clone(),
        recognizer,
    );

    session.connect().await.unwrap();
    session.submit_text("Solve 2x + 3 = 11").await.unwrap();
    drain_until_idle().await;

    let mut events = session.subscribe();
    session.submit_text("explain step 2").await.unwrap();
    drain_until_idle().await;

    // Routed to the explain call with the focus step and the larger budget
    assert_eq!(backend.call_count(), 2);
    let (messages, max_tokens) = backend.last_call();
    assert_eq!(max_tokens, 4000);
    assert!(messages[0].content.contains("understand Step 2 most deeply"));
    assert!(messages[0].content.contains("Step 2 (Subtract 3):"));

    // Whiteboard survives untouched; explain replies never repopulate it
    let steps = session.last_steps();
    assert_eq!(steps.len(), 4);
    assert!(steps.iter().all(|s| s.label != "Sneaky"));
    let mut cleared = false;
    while let Ok(ev) = events.try_recv() {
        if matches!(ev, SessionEvent::WhiteboardCleared) {
            cleared = true;
        }
    }
    assert!(!cleared);

    // The explanation itself was spoken
    assert!(synth
        .spoken()
        .iter()
        .any(|(text, _)| text.contains("subtracting three")));
}

#[tokio::test]
async fn explain_failure_speaks_local_walkthrough() {
    let backend = MockBackend::with_replies(vec![
        Ok(four_step_reply()),
        Err(LlmError::Network("down".into())),
    ]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(fast_settings(), backend, synth.clone(), recognizer);

    session.connect().await.unwrap();
    session.submit_text("Solve 2x + 3 = 11").await.unwrap();
    drain_until_idle().await;
    session.submit_text("explain").await.unwrap();

    let spoken = synth.spoken();
    let walkthrough = spoken
        .iter()
        .map(|(t, _)| t.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    assert!(walkthrough.contains("Let me walk you through the solution."));
    assert!(walkthrough.contains("step 1 is Write the Equation"));
}

#[tokio::test]
async fn rate_limit_speaks_quota_apology_and_stays_connected() {
    let backend =
        MockBackend::with_replies(vec![Err(LlmError::RateLimited("429".into()))]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(fast_settings(), backend, synth.clone(), recognizer);

    session.connect().await.unwrap();
    session.submit_text("Solve x^2 = 9").await.unwrap();

    assert_eq!(session.connection_state(), ConnectionState::Connected);
    assert!(synth
        .spoken()
        .iter()
        .any(|(text, _)| text.contains("Quota exceeded")));
}

#[tokio::test]
async fn missing_credential_fails_connect_and_reverts() {
    let mut settings = fast_settings();
    settings.llm.api_key = String::new();
    let backend = MockBackend::with_replies(vec![]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(settings, backend, synth.clone(), recognizer);

    assert!(session.connect().await.is_err());
    assert_eq!(session.connection_state(), ConnectionState::Error);

    // ERROR lingers briefly, then reverts to DISCONNECTED with no retry
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    assert!(synth.spoken().is_empty());
}

#[tokio::test]
async fn unavailable_recognizer_fails_connect() {
    let backend = MockBackend::with_replies(vec![]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(false);
    let session = TutorSession::new(fast_settings(), backend, synth, recognizer);

    assert!(session.connect().await.is_err());
    assert_eq!(session.connection_state(), ConnectionState::Error);
}

#[tokio::test]
async fn new_question_interrupts_running_speech() {
    let backend = MockBackend::with_replies(vec![
        Ok(r#"{"speech":"First answer, a long one that keeps playing.","steps":[]}"#
            .to_string()),
        Ok(r#"{"speech":"Second answer.","steps":[]}"#.to_string()),
    ]);
    let synth = MockSynth::slow(20);
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(
        fast_settings(),
        backend,
        synth.clone(),
        recognizer.clone(),
    );

    session.connect().await.unwrap();

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.submit_text("question one").await })
    };
    // Let the first reply start speaking, then barge in with a new question
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(session.is_speaking());
    session.submit_text("question two").await.unwrap();
    first.await.unwrap().unwrap();

    // Exactly one speech run survives; the interrupted one never advanced
    let spoken = synth.spoken();
    assert!(spoken.iter().any(|(t, _)| t == "Second answer."));
    assert_eq!(
        spoken.iter().filter(|(t, _)| t.contains("First answer")).count(),
        1
    );
    assert!(!session.is_speaking());
}

#[tokio::test]
async fn final_transcript_interrupts_voice_initiated_reply() {
    let backend = MockBackend::with_replies(vec![
        Ok(
            r#"{"speech":"First answer, still playing when the next question lands.","steps":[]}"#
                .to_string(),
        ),
        Ok(r#"{"speech":"Second answer.","steps":[]}"#.to_string()),
    ]);
    let synth = MockSynth::slow(40);
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(
        fast_settings(),
        backend.clone(),
        synth.clone(),
        recognizer.clone(),
    );

    session.connect().await.unwrap();

    // First question arrives by voice; its reply starts speaking
    recognizer
        .push(RecognizerEvent::Final("question one".to_string()))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.is_speaking());

    // A second final transcript mid-utterance must cancel the running
    // speech right away, not queue behind it
    recognizer
        .push(RecognizerEvent::Final("question two".to_string()))
        .await;
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(synth
        .interrupted_texts()
        .iter()
        .any(|t| t.contains("First answer")));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(backend.call_count(), 2);
    assert!(synth.spoken().iter().any(|(t, _)| t == "Second answer."));
    assert!(!session.is_speaking());
}

#[tokio::test]
async fn engine_ended_restarts_listening_while_reply_is_in_flight() {
    let backend = MockBackend::delayed(
        vec![Ok(r#"{"speech":"Done thinking.","steps":[]}"#.to_string())],
        100,
    );
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(fast_settings(), backend, synth, recognizer.clone());

    session.connect().await.unwrap();

    let pending = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.submit_text("slow question").await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(session.is_thinking());

    // The engine reports Ended after the processing stop; the mic must
    // come back while the reply is pending so live speech can barge in
    recognizer.push(RecognizerEvent::Ended).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(session.is_listening());

    pending.await.unwrap().unwrap();
}

#[tokio::test]
async fn interim_transcript_barges_in_and_final_is_processed() {
    let backend = MockBackend::with_replies(vec![Ok(
        r#"{"speech":"Processed the transcript.","steps":[]}"#.to_string(),
    )]);
    let synth = MockSynth::slow(50);
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(
        fast_settings(),
        backend.clone(),
        synth.clone(),
        recognizer.clone(),
    );

    // Connect blocks on the greeting; spawn it so the greeting is
    // genuinely mid-flight when the interim speech arrives
    let connecting = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.connect().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(session.is_speaking());

    recognizer
        .push(RecognizerEvent::Partial("wait".to_string()))
        .await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!session.is_speaking());
    connecting.await.unwrap().unwrap();

    recognizer
        .push(RecognizerEvent::Final("what is 2 plus 2".to_string()))
        .await;
    drain_until_idle().await;
    drain_until_idle().await;

    assert_eq!(backend.call_count(), 1);
    let (messages, _) = backend.last_call();
    assert_eq!(
        messages.last().unwrap().content,
        "what is 2 plus 2"
    );
}

#[tokio::test]
async fn listening_restarts_after_engine_ended() {
    let backend = MockBackend::with_replies(vec![]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(
        fast_settings(),
        backend,
        synth,
        recognizer.clone(),
    );

    session.connect().await.unwrap();
    drain_until_idle().await;
    let starts_before = recognizer.started_with.lock().len();
    assert!(starts_before >= 1);

    recognizer.push(RecognizerEvent::Ended).await;
    drain_until_idle().await;

    assert!(recognizer.started_with.lock().len() > starts_before);
    assert!(session.is_listening());
}

#[tokio::test]
async fn microphone_toggle_stops_and_restarts_listening() {
    let backend = MockBackend::with_replies(vec![]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(
        fast_settings(),
        backend,
        synth,
        recognizer.clone(),
    );

    session.connect().await.unwrap();
    drain_until_idle().await;
    assert!(session.is_listening());

    assert!(!session.toggle_microphone());
    assert!(!session.is_listening());
    assert!(*recognizer.stops.lock() >= 1);

    // Ended while the mic is off must not auto-restart
    recognizer.push(RecognizerEvent::Ended).await;
    drain_until_idle().await;
    assert!(!session.is_listening());

    assert!(session.toggle_microphone());
    assert!(session.is_listening());
}

#[tokio::test]
async fn disconnect_clears_everything() {
    let backend = MockBackend::with_replies(vec![Ok(four_step_reply())]);
    let synth = MockSynth::instant();
    let recognizer = MockRecognizer::new(true);
    let session = TutorSession::new(fast_settings(), backend, synth, recognizer);

    session.connect().await.unwrap();
    session.submit_text("Solve 2x + 3 = 11").await.unwrap();
    drain_until_idle().await;
    assert!(!session.last_steps().is_empty());

    session.disconnect();
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    assert!(session.last_steps().is_empty());
    assert_eq!(session.reveal().snapshot().phase, RevealPhase::Idle);
    assert!(!session.is_listening());
}
