//! Text processing for the tutoring agent
//!
//! Everything between the raw model reply and the renderer/synthesizer:
//! - LaTeX escape repair and math/prose classification
//! - Control-character sanitization and delimiter normalization
//! - Splitting a line into alternating text/math segments
//! - Stripping markup to produce speakable text
//! - Language detection (Devanagari script + romanized markers)

pub mod language;
pub mod latex;
pub mod segment;

pub use language::{detect_language, LanguageDetector};
pub use latex::{is_math_content, repair_latex, sanitize_line, strip_markup};
pub use segment::{classify_line, segment_line, LineKind};
