//! Whiteboard rendering glue
//!
//! Bridges solution lines to the math typesetting capability. Every
//! rendered unit lives in a [`MountPoint`] whose content is replaced in
//! place across renderer states (not ready, ok, failed); the mount itself
//! is stable so the display tree never churns.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use tutor_agent_core::{MathRenderer, Segment, SegmentKind};
use tutor_agent_text_processing::{is_math_content, repair_latex, segment_line};

static COMMANDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z]+").unwrap());
static BRACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[{}]").unwrap());

/// What currently occupies a mount point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountContent {
    /// Plain text shown as-is
    Plain(String),
    /// Engine markup from a successful typeset
    Markup(String),
}

/// A stable slot in the display tree
///
/// Content is the only thing that ever changes; a render failure swaps in
/// plain text at the same slot rather than removing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    content: MountContent,
    /// Display-style (centered block) vs inline flow
    pub is_block: bool,
}

impl MountPoint {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            content: MountContent::Plain(text.into()),
            is_block: false,
        }
    }

    pub fn content(&self) -> &MountContent {
        &self.content
    }

    pub fn set_content(&mut self, content: MountContent) {
        self.content = content;
    }

    /// The visible text or markup, whichever occupies the slot
    pub fn as_str(&self) -> &str {
        match &self.content {
            MountContent::Plain(s) => s,
            MountContent::Markup(s) => s,
        }
    }
}

/// Renders solution lines into mount points via the typesetting capability
pub struct WhiteboardRenderer {
    renderer: Arc<dyn MathRenderer>,
}

impl WhiteboardRenderer {
    pub fn new(renderer: Arc<dyn MathRenderer>) -> Self {
        Self { renderer }
    }

    /// Render one solution line into ordered mount points
    pub fn render_line(&self, line: &str) -> Vec<MountPoint> {
        segment_line(line)
            .iter()
            .map(|seg| self.render_segment(seg))
            .collect()
    }

    /// Render one segment, falling back to plain text on any failure
    pub fn render_segment(&self, segment: &Segment) -> MountPoint {
        if segment.kind == SegmentKind::Text {
            return MountPoint::plain(segment.value.clone());
        }

        let inner = strip_delimiters(&segment.value);

        // Dollar-wrapped prose happens; route it back to text
        if !is_math_content(inner) {
            return MountPoint::plain(inner.to_string());
        }

        let repaired = repair_latex(inner);
        let mut mount = MountPoint::plain(String::new());
        mount.is_block = segment.is_block_math;

        if !self.renderer.is_ready() {
            mount.set_content(MountContent::Plain(decommand(&repaired)));
            return mount;
        }

        match self.renderer.render(&repaired, segment.is_block_math) {
            Ok(rendered) => mount.set_content(MountContent::Markup(rendered.markup)),
            Err(err) => {
                tracing::warn!(formula = %repaired, error = %err, "typeset failed, using plain text");
                mount.set_content(MountContent::Plain(decommand(&repaired)));
            }
        }
        mount
    }
}

/// Strip `$`/`$$` delimiters from a math token, slice-based
fn strip_delimiters(value: &str) -> &str {
    let t = value.trim();
    if let Some(inner) = t.strip_prefix("$$").and_then(|s| s.strip_suffix("$$")) {
        return inner.trim();
    }
    if t.len() >= 2 {
        if let Some(inner) = t.strip_prefix('$').and_then(|s| s.strip_suffix('$')) {
            return inner.trim();
        }
    }
    t
}

/// Readable plain text for a formula the engine could not typeset:
/// commands and braces go, operands stay
fn decommand(latex: &str) -> String {
    let text = COMMANDS.replace_all(latex, " ");
    let text = BRACES.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
