//! Speech output for the tutoring agent
//!
//! Features:
//! - Word-boundary chunking of long spoken text
//! - Serial playback sequencing with cooperative cancellation
//!
//! The synthesizer itself is a capability trait in `tutor-agent-core`;
//! this crate owns the order, pacing and interruption semantics around it.

pub mod chunker;
pub mod sequencer;

pub use chunker::{chunk_text, split_paragraphs, DEFAULT_CHUNK_LIMIT};
pub use sequencer::SpeechSequencer;
