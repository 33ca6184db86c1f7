//! Line segmentation for rendering
//!
//! Splits one line of solution text into alternating plain-text and math
//! segments. The scan uses literal delimiter search (`str::find`), never a
//! pattern scan — a regex over math content would itself be confused by
//! backslashes.

use crate::latex::sanitize_line;
use tutor_agent_core::Segment;

/// Coarse classification of a whole line, a fast-path for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Nothing to render
    Empty,
    /// The entire line is a single `$$...$$` block
    MathBlock,
    /// Text with one or more embedded math spans
    Mixed,
    /// Plain prose
    Text,
}

/// Classify a line without segmenting it
pub fn classify_line(line: &str) -> LineKind {
    let t = line.trim();
    if t.is_empty() {
        return LineKind::Empty;
    }
    if t.starts_with("$$") && t.ends_with("$$") && t.len() > 4 && !t[2..t.len() - 2].contains("$$")
    {
        return LineKind::MathBlock;
    }
    if t.contains('$') {
        return LineKind::Mixed;
    }
    LineKind::Text
}

/// Split a line into ordered text/math segments
///
/// `$$...$$` spanning the entire trimmed line is flagged for block
/// (display) rendering; any other math span — including a `$$...$$`
/// sharing the line with other content — renders inline. An unterminated
/// delimiter is literal text from that point to end of line. Empty
/// segments are dropped.
pub fn segment_line(line: &str) -> Vec<Segment> {
    let s = sanitize_line(line);
    let mut out: Vec<Segment> = Vec::new();
    let mut i = 0;

    while i < s.len() {
        let Some(rel) = s[i..].find('$') else {
            out.push(Segment::text(&s[i..]));
            break;
        };
        let d = i + rel;
        if d > i {
            out.push(Segment::text(&s[i..d]));
        }

        if s[d..].starts_with("$$") {
            match s[d + 2..].find("$$") {
                Some(rel2) => {
                    let e = d + 2 + rel2;
                    let token = &s[d..e + 2];
                    // Display style only when this token IS the whole line
                    let is_block = s.trim() == token.trim();
                    out.push(Segment::math(token, is_block));
                    i = e + 2;
                },
                None => {
                    out.push(Segment::text(&s[d..]));
                    i = s.len();
                },
            }
        } else {
            match s[d + 1..].find('$') {
                Some(rel2) => {
                    let e = d + 1 + rel2;
                    out.push(Segment::math(&s[d..=e], false));
                    i = e + 1;
                },
                None => {
                    out.push(Segment::text(&s[d..]));
                    i = s.len();
                },
            }
        }
    }

    out.retain(|seg| !seg.value.is_empty());
    out
}
