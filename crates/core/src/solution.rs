//! Solution types produced by the response extractor
//!
//! A model reply parses into a [`ParsedResponse`]: a plain-text `speech`
//! string meant to be spoken, plus zero or more whiteboard [`SolutionStep`]s.
//! Steps are immutable after creation and are superseded wholesale by the
//! next question, never mutated.

use serde::{Deserialize, Serialize};

/// Canned speech used whenever a reply cannot be parsed or yields no
/// speakable text.
pub const FALLBACK_SPEECH: &str = "Here is the solution on the whiteboard!";

/// One labeled unit of a worked solution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionStep {
    /// 1-based position, stable ordering
    pub step: u32,
    /// Short heading, e.g. "Factor the Quadratic"
    pub label: String,
    /// Renderable lines; math is dollar-delimited LaTeX
    #[serde(default)]
    pub lines: Vec<String>,
}

impl SolutionStep {
    pub fn new(step: u32, label: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            step,
            label: label.into(),
            lines,
        }
    }

    /// Number of non-empty renderable lines (used to pace the reveal)
    pub fn line_count(&self) -> usize {
        self.lines.iter().filter(|l| !l.trim().is_empty()).count()
    }
}

/// Validated structure extracted from one model reply
///
/// Invariants: `speech` is never empty (a canned fallback substitutes), and
/// `steps` is empty exactly when the reply is a direct answer with no
/// whiteboard content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    /// Plain, LaTeX-free text meant to be spoken aloud
    pub speech: String,
    /// Whiteboard steps, possibly empty
    #[serde(default)]
    pub steps: Vec<SolutionStep>,
}

impl ParsedResponse {
    /// The hardcoded fallback returned when every parse stage fails
    pub fn fallback() -> Self {
        Self {
            speech: FALLBACK_SPEECH.to_string(),
            steps: Vec::new(),
        }
    }

    /// True when the reply carries no whiteboard content
    pub fn is_direct_answer(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Classification of a segment within one rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Plain prose, rendered as-is
    Text,
    /// Dollar-delimited LaTeX, routed to the typesetting capability
    Math,
}

/// Transient rendering unit: a contiguous run of a line classified as
/// plain text or math. Produced per line, consumed immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub value: String,
    /// Display-style (centered, own line) vs inline math. Always false for
    /// text segments.
    pub is_block_math: bool,
}

impl Segment {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Text,
            value: value.into(),
            is_block_math: false,
        }
    }

    pub fn math(value: impl Into<String>, is_block_math: bool) -> Self {
        Self {
            kind: SegmentKind::Math,
            value: value.into(),
            is_block_math,
        }
    }
}
