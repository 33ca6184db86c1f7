//! Voice selection parameters
//!
//! Rate/pitch presets are tuned per language; voice parameters are fixed
//! for a whole turn based on the detected language of that turn, never per
//! chunk.

use crate::Language;
use serde::{Deserialize, Serialize};

/// Voice configuration passed to the speech synthesis capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Language of the turn
    pub language: Language,
    /// Speaking rate (1.0 = engine default)
    pub rate: f32,
    /// Pitch (1.0 = engine default)
    pub pitch: f32,
}

impl VoiceConfig {
    /// Preset for a language, tuned for a patient teacher voice
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::English => Self {
                language,
                rate: 0.82,
                pitch: 1.05,
            },
            Language::Hindi => Self {
                language,
                rate: 0.78,
                pitch: 1.0,
            },
        }
    }

    /// BCP-47 tag forwarded to the engine for voice lookup
    pub fn bcp47(&self) -> &'static str {
        self.language.bcp47()
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self::for_language(Language::default())
    }
}
