//! Math typesetting capability

use thiserror::Error;

/// Typesetting failure for a single formula
///
/// Recovered locally: the caller falls back to de-commanded plain text for
/// that formula only. Never affects other formulas or the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Engine not yet loaded
    #[error("renderer not ready")]
    NotReady,
    /// Engine rejected the input
    #[error("malformed formula: {0}")]
    Malformed(String),
}

/// Typeset output for one formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Engine-specific markup to place at the mount point
    pub markup: String,
    /// Display-style (centered) vs inline
    pub display_mode: bool,
}

/// Math typesetting interface
///
/// `render(source, display_mode)` may fail on malformed input; callers must
/// catch and fall back rather than propagate.
pub trait MathRenderer: Send + Sync + 'static {
    /// Typeset one LaTeX formula
    fn render(&self, source: &str, display_mode: bool) -> Result<Rendered, RenderError>;

    /// Whether the engine has finished loading
    fn is_ready(&self) -> bool;

    /// Engine name for logging
    fn engine_name(&self) -> &str;
}
