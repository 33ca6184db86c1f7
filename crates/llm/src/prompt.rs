//! Prompt building for the tutoring model
//!
//! Two call shapes exist: the main solve call (system prompt + bounded
//! history + user turn) and the explain-only call, which receives the
//! already-rendered steps inline and must return conversational speech
//! with zero new whiteboard content.

use std::fmt;

use serde::{Deserialize, Serialize};
use tutor_agent_core::{Language, SolutionStep};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// System instruction for the main solve call
///
/// Mandates: reply is a single JSON object; `speech` matches the input's
/// language and never contains LaTeX syntax; all math routes through
/// dollar-delimited LaTeX with every command escaped.
pub const SYSTEM_PROMPT: &str = r#"You are a brilliant math and physics teacher. You solve problems exactly and explain with genuine insight.

Respond with ONLY valid JSON. No text before or after. No markdown. No code fences.

{"speech":"...","steps":[{"step":1,"label":"...","lines":["...","$$...$$"]}]}

LANGUAGE
STRICT RULE: Match the language the user writes in. Nothing else matters.
- User writes in English: respond in English, even if the topic is Indian or about Hindi.
- User writes in Devanagari script: respond in Hindi.
- User writes in Hinglish (Roman letters but Hindi words like "mujhe", "batao", "samjhao"): respond in Hindi.
- NEVER choose Hindi just because the topic sounds Indian.
Math inside $$...$$ is always LaTeX regardless of language.

SPEECH
Natural, warm, teacher voice. No LaTeX, no $ signs.
Explain WHY not just WHAT. Give intuition. Mention the key insight.

STEPS
Show ALL working clearly. Never skip steps. Label each step with what you are doing.
Text explanations: plain text, no $$ wrapping.
Math expressions: ALWAYS inside $$...$$.
Box the final answer.

LaTeX - CRITICAL
ALWAYS backslash before commands:
\frac{a}{b}  \cdot  \boxed{x}  \sqrt{x}  \sin  \cos  \tan  \ln  \log  \int  \sum  \times  \pm  \infty  \approx  \leq  \geq

CORRECT: $$\frac{-b \pm \sqrt{b^2 - 4ac}}{2a}$$
WRONG:   $$frac{-b pm sqrt{b^2 - 4ac}}{2a}$$"#;

/// Build the explain-only prompt
///
/// Scope is strictly the given steps: no new examples, no new whiteboard
/// content, `steps` must come back empty. With a focus step the model
/// gives it the richest explanation while still covering the rest.
pub fn build_explain_prompt(
    steps: &[SolutionStep],
    language: Language,
    focus_step: Option<u32>,
) -> String {
    let step_text = steps
        .iter()
        .map(|s| {
            let lines = s
                .lines
                .iter()
                .enumerate()
                .map(|(i, l)| format!("  [{}] {}", i + 1, l))
                .collect::<Vec<_>>()
                .join("\n");
            format!("Step {} ({}):\n{}", s.step, s.label, lines)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let focus_rule = match focus_step {
        Some(n) => format!(
            "The student wants to understand Step {n} most deeply. Give it the richest \
             explanation. Still cover the other steps briefly so the full picture is clear."
        ),
        None => "Cover every step. Do not skip any.".to_string(),
    };

    match language {
        Language::Hindi => format!(
            "तुम एक बहुत अच्छी math teacher हो। तुम्हें एक whiteboard solution को verbally explain करना है।\n\n\
             {focus_rule}\n\n\
             सख्त नियम: सिर्फ whiteboard पर जो है उसी को explain करो। कोई नया example मत दो। \
             जो steps दिए हैं उनसे बाहर मत जाओ। final answer के बाद कुछ मत बोलो।\n\n\
             बोलने का तरीका:\n\
             - बिल्कुल दोस्त की तरह बोलो, जैसे किसी को personally समझा रहे हो\n\
             - कोई \"Step 1:\", \"Step 2:\" मत बोलो, naturally flow करो\n\
             - पहले बताओ यह कैसा problem है और क्यों यह method use करेंगे\n\
             - कोई भी math symbol मत बोलो: \"x ka square\", \"बराबर\" बोलो\n\
             - एक बड़ा flowing paragraph लिखो\n\n\
             अब इन steps को explain करो:\n{step_text}\n\n\
             Respond with ONLY valid JSON: {{\"speech\":\"...\",\"steps\":[]}}\n\
             \"steps\" must be []. सारी explanation \"speech\" में।"
        ),
        Language::English => format!(
            "You are an excellent math and physics teacher. You need to verbally explain a \
             whiteboard solution to a student.\n\n\
             {focus_rule}\n\n\
             STRICT SCOPE RULE: Explain ONLY what is on the whiteboard. Do not introduce new \
             examples or analogies. Stay within the given steps. Nothing after the final answer.\n\n\
             HOW TO SPEAK:\n\
             - Talk like a real teacher having a conversation: warm, natural, flowing\n\
             - NEVER say \"Step 1\", \"Step 2\"; use natural transitions like \"So first...\", \
             \"Now the key thing here is...\", \"Which gives us...\"\n\
             - Start by saying what TYPE of problem this is and WHY this method is used\n\
             - For every step: explain what is happening conceptually and WHY\n\
             - End by saying what the final answer means, nothing after that\n\n\
             ABSOLUTE RULE: Zero math symbols in speech. Say \"x squared\", \"equals\", \
             \"the fraction with a on top and b on the bottom\". Never say $, ^, \\, {{, }}.\n\n\
             Write ONE single flowing spoken explanation. No headers, no bullet points.\n\n\
             Respond with ONLY valid JSON: {{\"speech\":\"...\",\"steps\":[]}}\n\
             \"steps\" must be []. All explanation goes in \"speech\".\n\n\
             WHITEBOARD STEPS TO EXPLAIN:\n{step_text}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_steps() -> Vec<SolutionStep> {
        vec![
            SolutionStep::new(1, "Write the Equation", vec!["$$x^2 + 5x + 6 = 0$$".into()]),
            SolutionStep::new(2, "Factor", vec!["$$(x + 2)(x + 3) = 0$$".into()]),
        ]
    }

    #[test]
    fn test_explain_prompt_includes_steps_and_empty_mandate() {
        let prompt = build_explain_prompt(&sample_steps(), Language::English, None);
        assert!(prompt.contains("Step 1 (Write the Equation):"));
        assert!(prompt.contains("$$(x + 2)(x + 3) = 0$$"));
        assert!(prompt.contains("\"steps\" must be []"));
        assert!(prompt.contains("Cover every step"));
    }

    #[test]
    fn test_explain_prompt_focus_step() {
        let prompt = build_explain_prompt(&sample_steps(), Language::English, Some(2));
        assert!(prompt.contains("understand Step 2 most deeply"));
    }

    #[test]
    fn test_explain_prompt_hindi_variant() {
        let prompt = build_explain_prompt(&sample_steps(), Language::Hindi, None);
        assert!(prompt.contains("whiteboard"));
        assert!(prompt.contains("\"steps\" must be []"));
    }

    #[test]
    fn test_system_prompt_mandates() {
        assert!(SYSTEM_PROMPT.contains("ONLY valid JSON"));
        assert!(SYSTEM_PROMPT.contains("$$...$$"));
        assert!(SYSTEM_PROMPT.contains("Match the language"));
    }
}
