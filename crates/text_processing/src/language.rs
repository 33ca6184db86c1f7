//! Language detection
//!
//! A binary classifier today (English vs Hindi) built from two heuristics:
//! Devanagari script presence, then romanized-Hindi (Hinglish) marker
//! words. Thresholds are tunable; the detector is a struct so additional
//! languages can plug in behind the same call shape.

use tutor_agent_core::Language;

/// Unambiguous romanized-Hindi markers. Short/common words that appear in
/// ordinary English sentences ("the", "se", "ko", "main", ...) are
/// deliberately excluded — they cause false positives.
const HINGLISH_MARKERS: &[&str] = &[
    "mujhe", "tumhe", "aapko",
    "kya", "hai", "hain",
    "nahi", "nhi", "kyun", "kaise", "kab", "kahan", "kaun",
    "batao", "samjhao", "dekho", "bolo", "suno", "achha", "accha",
    "hota", "hoti", "hote", "karo", "karna", "karke",
    "mein", "yeh", "woh", "toh",
    "sirf", "bahut", "bohot", "thoda", "aur",
];

/// Script- and keyword-based language classifier
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    /// Minimum Devanagari characters to classify as Hindi outright
    devanagari_threshold: usize,
    /// Minimum marker-word matches to classify romanized text as Hindi.
    /// Tuned by trial; known to misclassify short mixed utterances.
    marker_threshold: usize,
}

impl LanguageDetector {
    pub fn new(devanagari_threshold: usize, marker_threshold: usize) -> Self {
        Self {
            devanagari_threshold,
            marker_threshold,
        }
    }

    /// Classify one user turn
    pub fn detect(&self, text: &str) -> Language {
        let devanagari = text
            .chars()
            .filter(|c| ('\u{0900}'..='\u{097F}').contains(c))
            .count();
        if devanagari > self.devanagari_threshold {
            return Language::Hindi;
        }

        let lower = text.to_lowercase();
        let matches = lower
            .split_whitespace()
            .filter(|w| HINGLISH_MARKERS.contains(w))
            .count();
        if matches >= self.marker_threshold {
            Language::Hindi
        } else {
            Language::English
        }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(2, 2)
    }
}

/// Classify with the default thresholds
pub fn detect_language(text: &str) -> Language {
    LanguageDetector::default().detect(text)
}
