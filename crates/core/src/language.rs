//! Language definitions
//!
//! The tutor currently distinguishes two languages. The enum is the shared
//! vocabulary; the actual classification heuristics live in the text
//! processing crate so additional languages can plug in without touching
//! core types.

use serde::{Deserialize, Serialize};

/// Languages the tutor speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Primary (default) language
    #[default]
    English,
    /// Secondary language, detected via Devanagari script or romanized
    /// (Hinglish) markers
    Hindi,
}

impl Language {
    /// BCP-47 tag used when selecting recognition/synthesis voices
    pub fn bcp47(&self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Hindi => "hi-IN",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Hindi => "hindi",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
