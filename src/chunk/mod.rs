//! Sentence-based text chunking
//!
//! Documents are split into groups of whole sentences so each chunk stays a
//! coherent embeddable unit. Whitespace is collapsed before splitting, which
//! keeps offline text and indexed text directly comparable.

use crate::config::ChunkConfig;
use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static WHITESPACE: OnceLock<Regex> = OnceLock::new();

fn whitespace_re() -> &'static Regex {
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Collapse all whitespace runs (newlines, tabs, repeated spaces) to single spaces
pub fn normalize_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text, " ").trim().to_string()
}

/// Split text into sentences using Unicode sentence boundaries.
///
/// Text without terminal punctuation comes back as a single sentence, so the
/// caller never sees an empty split for non-empty input.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split_sentence_bounds()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split normalized text into chunks of at most `max_sentences` sentences.
///
/// For any non-empty input this returns at least one non-empty chunk: if no
/// sentence boundary is detected the whole text becomes one chunk.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return Vec::new();
    }

    let max_sentences = config.max_sentences.max(1);
    let sentences = split_sentences(&text);
    if sentences.is_empty() {
        return vec![text];
    }

    sentences
        .chunks(max_sentences)
        .map(|group| group.join(" "))
        .collect()
}
