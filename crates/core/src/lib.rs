//! Core traits and types for the tutoring agent
//!
//! This crate provides foundational types used across all other crates:
//! - Solution/response types produced by the response extractor
//! - Conversation types with a bounded history window
//! - Language definitions and per-language voice presets
//! - Session and reveal state enums
//! - Cooperative cancellation primitives
//! - Capability traits for speech and math typesetting engines
//! - Error types

pub mod cancel;
pub mod conversation;
pub mod error;
pub mod language;
pub mod solution;
pub mod state;
pub mod traits;
pub mod voice;

pub use cancel::{CancelSource, CancelToken};
pub use conversation::{ConversationHistory, Turn, TurnRole};
pub use error::{Error, Result};
pub use language::Language;
pub use solution::{ParsedResponse, Segment, SegmentKind, SolutionStep, FALLBACK_SPEECH};
pub use state::{ConnectionState, RevealPhase, RevealState, SpeechOutcome};
pub use voice::VoiceConfig;

pub use traits::{
    MathRenderer, RecognizerError, RecognizerEvent, RenderError, Rendered, SpeechRecognizer,
    SpeechSynthesizer,
};
