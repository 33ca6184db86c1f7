//! Text chunking for speech synthesis
//!
//! Long utterances make synthesis engines glitch and defeat interruption
//! (a cancel mid-utterance loses the whole remainder). Chunks are cut at
//! word boundaries near a fixed limit so each one is short enough to
//! finish or abandon cheaply.

use unicode_segmentation::UnicodeSegmentation;

/// Default maximum chunk length in grapheme clusters
pub const DEFAULT_CHUNK_LIMIT: usize = 180;

/// Split text into speakable chunks of at most `limit` graphemes
///
/// Cuts at the last whitespace at-or-before the limit; a run with no
/// whitespace inside the window is hard-cut at the limit (always on a
/// grapheme boundary). Pieces are trimmed and empties dropped.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let mut remaining = text.trim();
    if remaining.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    loop {
        let window_end = match remaining.grapheme_indices(true).nth(limit) {
            Some((byte_idx, _)) => byte_idx,
            None => {
                // Fits whole
                chunks.push(remaining.to_string());
                return chunks;
            }
        };

        let head = &remaining[..window_end];
        let cut = match head.rfind(char::is_whitespace) {
            Some(idx) if idx > 0 => idx,
            _ => window_end,
        };

        let piece = remaining[..cut].trim_end();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        remaining = remaining[cut..].trim_start();
        if remaining.is_empty() {
            return chunks;
        }
    }
}

/// Split spoken text into paragraphs for sequencing
///
/// Blank-line separation wins; falls back to single newlines, then to the
/// whole text as one paragraph. Length splitting is the chunker's job,
/// never done here.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let by_blank: Vec<String> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if by_blank.len() > 1 {
        return by_blank;
    }

    let by_line: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if by_line.len() > 1 {
        return by_line;
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![trimmed.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("The answer is four.", 180);
        assert_eq!(chunks, vec!["The answer is four."]);
    }

    #[test]
    fn test_chunks_respect_limit_and_word_boundaries() {
        let word = "word ";
        let text = word.repeat(100); // 500 chars
        let chunks = chunk_text(&text, 180);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.graphemes(true).count() <= 180, "chunk too long: {chunk:?}");
            assert!(!chunk.starts_with(' '));
            assert!(!chunk.ends_with(' '));
        }
        // Nothing lost
        let rejoined = chunks.join(" ");
        assert_eq!(rejoined, text.trim());
    }

    #[test]
    fn test_unsplittable_run_hard_cut() {
        let text = "a".repeat(400);
        let chunks = chunk_text(&text, 180);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 180);
        assert_eq!(chunks[2].len(), 40);
    }

    #[test]
    fn test_devanagari_not_split_mid_cluster() {
        let text = "समीकरण ".repeat(60);
        for chunk in chunk_text(&text, 180) {
            assert!(chunk.chars().count() <= 180 * 2);
            // Re-slicing at every produced boundary must not panic,
            // which the String allocation above already guarantees
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(chunk_text("   ", 180).is_empty());
        assert!(split_paragraphs("  \n ").is_empty());
    }

    #[test]
    fn test_split_paragraphs_blank_line_wins() {
        let paras = split_paragraphs("First part.\n\nSecond part.\nStill second? No, third.");
        assert_eq!(paras.len(), 2);
        assert_eq!(paras[0], "First part.");
    }

    #[test]
    fn test_split_paragraphs_newline_fallback() {
        let paras = split_paragraphs("First line.\nSecond line.");
        assert_eq!(paras, vec!["First line.", "Second line."]);
    }

    #[test]
    fn test_split_paragraphs_whole_text_fallback() {
        let paras = split_paragraphs("One single flowing explanation.");
        assert_eq!(paras.len(), 1);
    }
}
