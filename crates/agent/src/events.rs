//! Session events broadcast to UI consumers
//!
//! Events are state-change notifications, not state itself; consumers read
//! current state through the session's getters. Lagging receivers drop the
//! oldest events, which is acceptable for display updates.

use tutor_agent_core::{ConnectionState, SolutionStep};

/// Everything a front-end needs to observe about a running session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Connection lifecycle transition
    StateChanged(ConnectionState),
    /// Listening started or stopped
    ListeningChanged(bool),
    /// A model call is in flight
    ThinkingChanged(bool),
    /// Speech playback started or stopped
    SpeakingChanged(bool),
    /// Partial transcript, may be revised
    InterimTranscript(String),
    /// Final transcript accepted for processing
    FinalTranscript(String),
    /// A new solution arrived; the reveal controller takes over pacing
    StepsPublished(Vec<SolutionStep>),
    /// The whiteboard was cleared for a new question
    WhiteboardCleared,
}
