//! Bounded long-term memory per user
//!
//! Every chat turn folds a short snippet of the interaction into a single
//! memory record per user. The write path merges any stray records into the
//! oldest one (the primary) and compacts with an extractive summarizer so the
//! stored text never exceeds the configured ceiling. Summarization is
//! deterministic and offline: whole leading sentences are kept while they fit,
//! with a hard character cut as the last resort.

use crate::chunk::{normalize_whitespace, split_sentences};
use crate::config::MemoryConfig;
use crate::error::Result;
use crate::meta::MetaDb;
use tracing::debug;

/// Long-term memory store, one compacted record per user
pub struct MemoryStore {
    db: MetaDb,
    config: MemoryConfig,
}

/// Truncate to at most `max_chars` characters (not bytes)
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// Extractive summarization: keep whole leading sentences within `target_chars`.
///
/// Never panics on pathological input and always returns at most
/// `target_chars` characters: if even the first sentence does not fit, or no
/// sentence boundary exists, the text is hard-truncated from the start.
pub fn summarize_extractive(text: &str, target_chars: usize) -> String {
    if text.chars().count() <= target_chars {
        return text.to_string();
    }

    let mut summary = String::new();
    let mut summary_chars = 0;
    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();
        let added = if summary.is_empty() {
            sentence_chars
        } else {
            sentence_chars + 1
        };
        if summary_chars + added > target_chars {
            break;
        }
        if !summary.is_empty() {
            summary.push(' ');
        }
        summary.push_str(sentence);
        summary_chars += added;
    }

    if summary.is_empty() {
        return truncate_chars(text, target_chars).trim_end().to_string();
    }

    summary
}

impl MemoryStore {
    pub fn new(db: MetaDb, config: MemoryConfig) -> Self {
        Self { db, config }
    }

    /// Build a succinct snippet from the latest interaction.
    ///
    /// Returns `None` when there is nothing worth remembering.
    pub fn build_snippet(&self, user_message: &str, assistant_message: &str) -> Option<String> {
        let user_part = normalize_whitespace(user_message);
        let assistant_part = normalize_whitespace(assistant_message);

        if user_part.is_empty() && assistant_part.is_empty() {
            return None;
        }

        let snippet = format!(
            "User said: {}. Assistant replied: {}.",
            user_part, assistant_part
        );

        let max = self.config.snippet_max_chars;
        if snippet.chars().count() > max {
            let clipped = truncate_chars(&snippet, max.saturating_sub(3));
            return Some(format!("{}...", clipped.trim_end()));
        }
        Some(snippet)
    }

    /// Fold the latest user/assistant exchange into the user's memory.
    ///
    /// After this call the user has exactly one memory record, no longer than
    /// the configured ceiling. The delete-redundant and update-primary steps
    /// are separate statements; a concurrent write for the same user can race
    /// (accepted tradeoff, see DESIGN.md).
    pub async fn record_interaction(
        &self,
        user_id: i64,
        user_message: &str,
        assistant_message: &str,
    ) -> Result<()> {
        let Some(snippet) = self.build_snippet(user_message, assistant_message) else {
            return Ok(());
        };

        let records = self.db.list_memory(user_id).await?;

        if records.is_empty() {
            let info = truncate_chars(&snippet, self.config.max_chars);
            self.db.insert_memory(user_id, &info).await?;
            debug!("Created memory record for user {}", user_id);
            return Ok(());
        }

        let primary = &records[0];
        let mut parts: Vec<String> = Vec::with_capacity(records.len() + 1);
        for record in &records {
            let trimmed = record.info.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
        parts.push(snippet);

        // Keep a single compact record to avoid unlimited growth of rows
        for redundant in &records[1..] {
            self.db.delete_memory(redundant.id).await?;
        }

        let mut payload = parts.join("\n");
        if payload.chars().count() > self.config.max_chars {
            payload = summarize_extractive(&payload, self.config.max_chars);
        }

        self.db.update_memory_info(primary.id, &payload).await?;
        Ok(())
    }

    /// Compact memory context for a user, empty string when none exists.
    ///
    /// The write path already enforces the ceiling; summarizing again here
    /// keeps the read robust to external mutation of the table.
    pub async fn get_context(&self, user_id: i64) -> Result<String> {
        let records = self.db.list_memory(user_id).await?;
        if records.is_empty() {
            return Ok(String::new());
        }

        let combined = records
            .iter()
            .map(|r| r.info.trim())
            .filter(|info| !info.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if combined.chars().count() > self.config.max_chars {
            return Ok(summarize_extractive(&combined, self.config.max_chars));
        }
        Ok(combined)
    }
}
