//! Model boundary for the tutoring agent
//!
//! Features:
//! - OpenAI-compatible chat completions backend (Groq-hosted model)
//! - Prompt construction (solve + explain variants, English/Hindi)
//! - Total response extraction from untrusted model output

pub mod backend;
pub mod extractor;
pub mod prompt;

pub use backend::{LlmBackend, OpenAiCompatBackend, OpenAiCompatConfig};
pub use extractor::extract;
pub use prompt::{build_explain_prompt, Message, Role, SYSTEM_PROMPT};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for tutor_agent_core::Error {
    fn from(err: LlmError) -> Self {
        tutor_agent_core::Error::Llm(err.to_string())
    }
}
