//! Capability traits for external engines
//!
//! Speech recognition, speech synthesis, and math typesetting are external
//! collaborators. They are consumed through these traits so the pipeline
//! can be driven by mocks in tests and by platform engines in production.

mod render;
mod speech;

pub use render::{MathRenderer, RenderError, Rendered};
pub use speech::{RecognizerError, RecognizerEvent, SpeechRecognizer, SpeechSynthesizer};
