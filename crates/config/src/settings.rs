//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Language model boundary
    #[serde(default)]
    pub llm: LlmSettings,

    /// Speech sequencing
    #[serde(default)]
    pub speech: SpeechSettings,

    /// Step reveal pacing
    #[serde(default)]
    pub reveal: RevealSettings,

    /// Language detection thresholds
    #[serde(default)]
    pub language: LanguageSettings,

    /// Session lifecycle
    #[serde(default)]
    pub session: SessionSettings,
}

/// Language model request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI-compatible chat completions endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Required secret credential; absence is a fatal connect-time error.
    /// Usually supplied via TUTOR_AGENT_LLM__API_KEY.
    #[serde(default)]
    pub api_key: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Token budget for the main solve call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Token budget for explain-only calls (longer flowing speech)
    #[serde(default = "default_explain_max_tokens")]
    pub explain_max_tokens: u32,

    /// Request timeout in seconds; fatal to the request, never the session
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the required credential is present
    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("llm.api_key".to_string()));
        }
        Ok(())
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            explain_max_tokens: default_explain_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Speech sequencing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    /// Maximum utterance length in characters. Browser engines silently
    /// cut off utterances past ~200 characters.
    #[serde(default = "default_chunk_limit")]
    pub chunk_limit: usize,

    /// Fixed pause between consecutive chunks to avoid engine artifacts
    #[serde(default = "default_inter_chunk_pause_ms")]
    pub inter_chunk_pause_ms: u64,
}

impl SpeechSettings {
    pub fn inter_chunk_pause(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_pause_ms)
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            chunk_limit: default_chunk_limit(),
            inter_chunk_pause_ms: default_inter_chunk_pause_ms(),
        }
    }
}

/// Step reveal pacing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealSettings {
    /// Base delay per step before it settles
    #[serde(default = "default_step_base_delay_ms")]
    pub step_base_delay_ms: u64,

    /// Additional delay per rendered line, pacing reveals to be readable
    #[serde(default = "default_per_line_delay_ms")]
    pub per_line_delay_ms: u64,

    /// Short settle delay between a step completing and the next starting
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Distance from the bottom (px) past which the user is considered to
    /// have scrolled away, disabling auto-scroll until the next question
    #[serde(default = "default_scroll_threshold_px")]
    pub scroll_threshold_px: u32,
}

impl RevealSettings {
    /// Pacing delay for one step given its rendered line count
    pub fn step_delay(&self, line_count: usize) -> Duration {
        Duration::from_millis(
            self.step_base_delay_ms + self.per_line_delay_ms * line_count.max(1) as u64,
        )
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for RevealSettings {
    fn default() -> Self {
        Self {
            step_base_delay_ms: default_step_base_delay_ms(),
            per_line_delay_ms: default_per_line_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            scroll_threshold_px: default_scroll_threshold_px(),
        }
    }
}

/// Language detection thresholds
///
/// The marker threshold is a heuristic tuned by trial; it will misclassify
/// short mixed-language utterances. Do not change it without product
/// guidance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageSettings {
    /// Minimum Devanagari characters to classify as Hindi outright
    #[serde(default = "default_devanagari_threshold")]
    pub devanagari_threshold: usize,

    /// Minimum romanized-Hindi marker words to classify as Hindi
    #[serde(default = "default_marker_threshold")]
    pub marker_threshold: usize,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            devanagari_threshold: default_devanagari_threshold(),
            marker_threshold: default_marker_threshold(),
        }
    }
}

/// Session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Bounded conversation history cap (entries, not exchanges)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// How long the ERROR state lingers before reverting to DISCONNECTED
    #[serde(default = "default_error_revert_ms")]
    pub error_revert_ms: u64,

    /// Delay before listening restarts after the engine reports Ended
    #[serde(default = "default_listen_restart_ms")]
    pub listen_restart_ms: u64,

    /// Greeting spoken once connected
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl SessionSettings {
    pub fn error_revert(&self) -> Duration {
        Duration::from_millis(self.error_revert_ms)
    }

    pub fn listen_restart(&self) -> Duration {
        Duration::from_millis(self.listen_restart_ms)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            error_revert_ms: default_error_revert_ms(),
            listen_restart_ms: default_listen_restart_ms(),
            greeting: default_greeting(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_tokens() -> u32 {
    3000
}

fn default_explain_max_tokens() -> u32 {
    4000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_chunk_limit() -> usize {
    180
}

fn default_inter_chunk_pause_ms() -> u64 {
    300
}

fn default_step_base_delay_ms() -> u64 {
    500
}

fn default_per_line_delay_ms() -> u64 {
    100
}

fn default_settle_delay_ms() -> u64 {
    150
}

fn default_scroll_threshold_px() -> u32 {
    80
}

fn default_devanagari_threshold() -> usize {
    2
}

fn default_marker_threshold() -> usize {
    2
}

fn default_history_limit() -> usize {
    10
}

fn default_error_revert_ms() -> u64 {
    3000
}

fn default_listen_restart_ms() -> u64 {
    200
}

fn default_greeting() -> String {
    "Hello! What's your question?".to_string()
}

/// Load settings from an optional file plus TUTOR_AGENT_ environment
/// variables (env wins; nested fields use `__`, e.g.
/// TUTOR_AGENT_LLM__API_KEY)
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        builder = builder.add_source(File::from(path));
    }

    let config = builder
        .add_source(Environment::with_prefix("TUTOR_AGENT").separator("__"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    tracing::debug!(model = %settings.llm.model, "settings loaded");
    Ok(settings)
}
