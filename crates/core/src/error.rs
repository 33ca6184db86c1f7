//! Workspace-level error type

use thiserror::Error;

/// Errors shared across the tutoring agent crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration problem (missing credential, bad settings file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Language model call failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// Speech synthesis failed (not an interruption)
    #[error("Speech error: {0}")]
    Speech(String),

    /// Speech recognition capability unavailable or failed
    #[error("Recognition error: {0}")]
    Recognition(String),

    /// Math typesetting failed for a formula
    #[error("Render error: {0}")]
    Render(String),

    /// Session lifecycle violation (e.g. interaction while disconnected)
    #[error("Session error: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, Error>;
