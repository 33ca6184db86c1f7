//! LaTeX repair, classification and stripping
//!
//! Models frequently emit `frac{a}{b}` where `\frac{a}{b}` was meant: the
//! single backslash gets eaten by JSON string escaping upstream. Repair
//! reinserts missing escapes for a fixed command vocabulary and is
//! idempotent, so re-repairing an already-correct string is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;

/// Commands that take a braced argument; repaired only when followed by `{`
const BRACE_COMMANDS: &[&str] = &[
    "frac", "boxed", "sqrt", "vec", "hat", "text", "mathrm", "mathbf", "mathit",
];

/// Commands repaired standalone at word boundaries (not adjacent to an
/// ASCII letter on either side)
const STANDALONE_COMMANDS: &[&str] = &[
    "cdot", "times", "pm", "infty", "leq", "geq", "neq", "approx", "sin", "cos", "tan", "ln",
    "log", "lim", "sum", "int", "partial", "alpha", "beta", "gamma", "theta", "lambda", "sigma",
    "pi", "nabla", "rightarrow", "leftarrow", "Rightarrow", "Leftarrow", "left", "right",
    "forall", "exists", "to", "equiv", "sim", "perp",
];

/// Insert missing backslashes before known LaTeX commands
///
/// A command is left alone when already escaped. Standalone commands must
/// sit at word boundaries, so `pi` inside `spin` is untouched while `2pi`
/// becomes `2\pi` (digits are not letters). Idempotent.
pub fn repair_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut chars = s.char_indices().peekable();
    let mut prev: Option<char> = None;

    while let Some(&(start, c)) = chars.peek() {
        if !c.is_ascii_alphabetic() {
            out.push(c);
            prev = Some(c);
            chars.next();
            continue;
        }

        // Maximal ASCII-letter run starting here
        let mut end = start;
        while let Some(&(j, cj)) = chars.peek() {
            if !cj.is_ascii_alphabetic() {
                break;
            }
            end = j + cj.len_utf8();
            chars.next();
        }
        let word = &s[start..end];
        let next_is_brace = matches!(chars.peek(), Some(&(_, '{')));
        let escaped = prev == Some('\\');

        // Brace commands repair at the suffix of a letter run: "subtext{"
        // is "sub" plus a missing "\text". A run-internal suffix is never
        // escaped (the char before it is a letter); a whole-run match
        // defers to the preceding backslash.
        let brace_suffix = if next_is_brace {
            BRACE_COMMANDS
                .iter()
                .filter(|cmd| word.ends_with(*cmd) && (word.len() > cmd.len() || !escaped))
                .max_by_key(|cmd| cmd.len())
        } else {
            None
        };

        if let Some(cmd) = brace_suffix {
            out.push_str(&word[..word.len() - cmd.len()]);
            out.push('\\');
            out.push_str(cmd);
        } else {
            if !escaped && STANDALONE_COMMANDS.contains(&word) {
                out.push('\\');
            }
            out.push_str(word);
        }
        prev = word.chars().last();
    }

    out
}

/// Classify a string as math vs prose
///
/// The non-ASCII check must run first: a Devanagari sentence may contain
/// `=` or digits but it is not math. The trailing branch deliberately
/// defaults to math — a failed typesetting attempt degrades gracefully,
/// dropped formatting does not.
pub fn is_math_content(s: &str) -> bool {
    let total = s.chars().count();
    if total > 0 {
        let non_ascii = s.chars().filter(|c| !c.is_ascii()).count();
        if non_ascii * 4 > total {
            return false;
        }
    }

    if s.contains('\\') {
        return true;
    }
    if s.chars().any(|c| matches!(c, '^' | '_' | '{' | '}')) {
        return true;
    }
    if s.chars()
        .any(|c| matches!(c, '=' | '+' | '-' | '*' | '/' | '<' | '>'))
    {
        return true;
    }
    if s.chars().any(|c| c.is_ascii_digit()) && s.chars().any(|c| c.is_ascii_alphabetic()) {
        return true;
    }
    true
}

/// Normalize control characters and delimiter conventions in one line
///
/// JSON corruption upstream turns `\b` and `\f` escape sequences into
/// literal backspace/form-feed bytes (`\boxed`, `\frac`); map them back.
/// `\[...\]` and `\(...\)` delimiters are normalized to the dollar
/// convention used everywhere else.
pub fn sanitize_line(s: &str) -> String {
    s.replace('\u{0008}', "\\b")
        .replace('\u{000C}', "\\f")
        .replace("\\[", "$$")
        .replace("\\]", "$$")
        .replace("\\(", "$")
        .replace("\\)", "$")
}

static BLOCK_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\$\$.*?\$\$").unwrap());
static INLINE_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[^$]*\$").unwrap());
static CMD_WITH_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z]+\{[^}]*\}").unwrap());
static BARE_CMD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z]+").unwrap());
static BRACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[{}]").unwrap());
static WS_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Strip all math markup, producing speakable text
///
/// Removes block and inline math spans, command-with-argument sequences,
/// bare commands and stray braces, then collapses whitespace runs.
pub fn strip_markup(text: &str) -> String {
    let text = BLOCK_MATH.replace_all(text, "");
    let text = INLINE_MATH.replace_all(&text, "");
    let text = CMD_WITH_ARG.replace_all(&text, "");
    let text = BARE_CMD.replace_all(&text, "");
    let text = BRACES.replace_all(&text, "");
    let text = WS_RUNS.replace_all(&text, " ");
    text.trim().to_string()
}
