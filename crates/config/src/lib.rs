//! Configuration management for the tutoring agent
//!
//! Supports loading configuration from:
//! - TOML files
//! - Environment variables (TUTOR_AGENT_ prefix)
//!
//! Every heuristic threshold in the pipeline (chunk limit, reveal pacing,
//! language detection thresholds) is a field here rather than a buried
//! literal, so product tuning never requires a code change.

pub mod settings;

pub use settings::{
    load_settings, LanguageSettings, LlmSettings, RevealSettings, SessionSettings, Settings,
    SpeechSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required credential: {0}")]
    MissingCredential(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}
