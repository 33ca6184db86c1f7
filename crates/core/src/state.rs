//! Session and reveal state enums

use crate::SolutionStep;
use serde::{Deserialize, Serialize};

/// Connection lifecycle of a tutoring session
///
/// Single source of truth for whether user interaction (typed send,
/// microphone) is permitted. Written only by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No session; interaction disabled
    #[default]
    Disconnected,
    /// Connect in progress
    Connecting,
    /// Session live; interaction permitted
    Connected,
    /// Fatal connect failure; auto-reverts to Disconnected after a short
    /// delay, no automatic retry
    Error,
}

/// Phase of the step reveal animation for the current question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevealPhase {
    /// No steps on the whiteboard
    #[default]
    Idle,
    /// Steps are being revealed one at a time
    Writing,
    /// All steps revealed; the explain trigger is meaningful
    Ready,
}

/// Per-question reveal state
///
/// Created when a new steps payload arrives; fully reset on disconnect or
/// new question; replaced when the next question's steps arrive.
#[derive(Debug, Clone, Default)]
pub struct RevealState {
    /// Steps already revealed, in order
    pub completed: Vec<SolutionStep>,
    /// Step currently animating into view
    pub active: Option<SolutionStep>,
    /// Current phase
    pub phase: RevealPhase,
}

impl RevealState {
    /// Reset to Idle, clearing completed and active steps
    pub fn reset(&mut self) {
        self.completed.clear();
        self.active = None;
        self.phase = RevealPhase::Idle;
    }

    /// Total steps visible (completed plus the active one)
    pub fn visible_count(&self) -> usize {
        self.completed.len() + usize::from(self.active.is_some())
    }
}

/// How a speech run (or a single utterance) finished
///
/// An explicit outcome replaces engine end-vs-error callback distinctions:
/// only `Completed` may advance a queue; `Interrupted` is expected and
/// frequent, and must never trigger the continuation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Finished naturally
    Completed,
    /// Cancelled mid-flight (barge-in, new question, disconnect)
    Interrupted,
    /// Genuine synthesis failure
    Failed,
}

impl SpeechOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SpeechOutcome::Completed)
    }
}
