//! Total extraction of structured responses from untrusted model output
//!
//! Models wrap JSON in prose, code fences, or emit raw control characters
//! where escaped LaTeX commands were meant. Extraction tries progressively
//! more forgiving stages and never fails: when nothing parses, the caller
//! gets a canned fallback response instead of an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use tutor_agent_core::{ParsedResponse, FALLBACK_SPEECH};
use tutor_agent_text_processing::{sanitize_line, strip_markup};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?").unwrap());

/// Extract a [`ParsedResponse`] from one raw model reply
///
/// Stages, in order: direct parse, code-fence strip, first-`{`/last-`}`
/// slice, canned fallback. The first stage that yields a valid object with
/// a string `speech` field wins.
pub fn extract(raw: &str) -> ParsedResponse {
    let prepared = escape_control_chars(raw);
    let trimmed = prepared.trim();

    if let Some(resp) = parse_candidate(trimmed) {
        return resp;
    }

    let defenced = CODE_FENCE.replace_all(trimmed, "");
    let defenced = defenced.trim();
    if let Some(resp) = parse_candidate(defenced) {
        return resp;
    }

    if let (Some(open), Some(close)) = (defenced.find('{'), defenced.rfind('}')) {
        if open < close {
            if let Some(resp) = parse_candidate(&defenced[open..=close]) {
                return resp;
            }
        }
    }

    tracing::warn!(
        reply_len = raw.len(),
        "model reply unparseable at every stage, using fallback"
    );
    ParsedResponse::fallback()
}

/// Re-escape raw control characters that were meant to be LaTeX commands
///
/// A model emitting `\boxed` inside a JSON string without doubling the
/// backslash produces a literal backspace byte, which is invalid JSON.
/// Mapping the byte back to its two-character escape makes the document
/// parseable again; [`sanitize_line`] later restores the backslash form.
fn escape_control_chars(s: &str) -> String {
    if !s.contains(['\u{0008}', '\u{000C}']) {
        return s.to_string();
    }
    s.replace('\u{0008}', "\\b").replace('\u{000C}', "\\f")
}

/// Parse one candidate slice, or None to let the next stage try
fn parse_candidate(candidate: &str) -> Option<ParsedResponse> {
    let mut value: Value = serde_json::from_str(candidate).ok()?;

    // speech must exist and be a string; anything else is malformed enough
    // to distrust the whole object
    if !matches!(value.get("speech"), Some(Value::String(_))) {
        return None;
    }

    sanitize_strings(&mut value);
    let parsed: ParsedResponse = serde_json::from_value(value).ok()?;
    Some(finalize(parsed))
}

/// Normalize every string in the document in place
fn sanitize_strings(value: &mut Value) {
    match value {
        Value::String(s) => {
            let cleaned = sanitize_line(s);
            if cleaned != *s {
                *s = cleaned;
            }
        }
        Value::Array(items) => {
            for item in items {
                sanitize_strings(item);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                sanitize_strings(item);
            }
        }
        _ => {}
    }
}

/// Enforce the speech invariant: plain, speakable, never empty
fn finalize(mut parsed: ParsedResponse) -> ParsedResponse {
    let spoken = strip_markup(&parsed.speech);
    parsed.speech = if spoken.is_empty() {
        FALLBACK_SPEECH.to_string()
    } else {
        spoken
    };
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_parse() {
        let raw = r#"{"speech":"We factor the quadratic.","steps":[{"step":1,"label":"Factor","lines":["$$(x+2)(x+3)=0$$"]}]}"#;
        let resp = extract(raw);
        assert_eq!(resp.speech, "We factor the quadratic.");
        assert_eq!(resp.steps.len(), 1);
        assert_eq!(resp.steps[0].lines[0], "$$(x+2)(x+3)=0$$");
    }

    #[test]
    fn test_code_fence_stripped() {
        let raw = "```json\n{\"speech\":\"Done.\",\"steps\":[]}\n```";
        let resp = extract(raw);
        assert_eq!(resp.speech, "Done.");
        assert!(resp.is_direct_answer());
    }

    #[test]
    fn test_surrounding_commentary_sliced() {
        let raw = "Sure, here is the answer:\n{\"speech\":\"The answer is four.\",\"steps\":[]}\nHope that helps!";
        let resp = extract(raw);
        assert_eq!(resp.speech, "The answer is four.");
    }

    #[test]
    fn test_garbage_falls_back() {
        let resp = extract("I cannot respond in JSON today.");
        assert_eq!(resp.speech, FALLBACK_SPEECH);
        assert!(resp.steps.is_empty());
    }

    #[test]
    fn test_empty_input_falls_back() {
        assert_eq!(extract("").speech, FALLBACK_SPEECH);
    }

    #[test]
    fn test_non_string_speech_rejected() {
        let resp = extract(r#"{"speech": 42, "steps": []}"#);
        assert_eq!(resp.speech, FALLBACK_SPEECH);
    }

    #[test]
    fn test_control_char_repair() {
        // Literal backspace where "\boxed" was meant; invalid JSON as-is
        let raw = "{\"speech\":\"Boxed it.\",\"steps\":[{\"step\":1,\"label\":\"Answer\",\"lines\":[\"$$\u{0008}oxed{4}$$\"]}]}";
        let resp = extract(raw);
        assert_eq!(resp.steps[0].lines[0], "$$\\boxed{4}$$");
    }

    #[test]
    fn test_bracket_delimiters_normalized_in_lines() {
        let raw = r#"{"speech":"See the board.","steps":[{"step":1,"label":"Setup","lines":["\\[x^2\\]"]}]}"#;
        let resp = extract(raw);
        assert_eq!(resp.steps[0].lines[0], "$$x^2$$");
    }

    #[test]
    fn test_latex_stripped_from_speech() {
        let raw = r#"{"speech":"The result is $$x = 4$$ as shown.","steps":[]}"#;
        let resp = extract(raw);
        assert_eq!(resp.speech, "The result is as shown.");
    }

    #[test]
    fn test_markup_only_speech_substitutes_fallback() {
        let raw = r#"{"speech":"$$x = 4$$","steps":[]}"#;
        let resp = extract(raw);
        assert_eq!(resp.speech, FALLBACK_SPEECH);
    }

    #[test]
    fn test_missing_steps_defaults_empty() {
        let resp = extract(r#"{"speech":"Just an answer."}"#);
        assert!(resp.is_direct_answer());
    }
}
