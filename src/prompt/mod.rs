//! Prompt assembly for the generation service
//!
//! A request is an ordered list of role-tagged turns: one system turn
//! (instructions, optional user profile, compacted memory), up to the last N
//! prior conversation turns oldest first, then one user turn carrying the
//! retrieved context and the literal question. Empty turns are dropped; the
//! assembled list goes to the generation collaborator unmodified.

use serde::{Deserialize, Serialize};

/// Role of one conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One role-tagged message turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Static assistant instructions for the system turn
const SYSTEM_INSTRUCTIONS: &str = "You are a document assistant that answers questions \
thoroughly and accurately using the information from the provided document context. \
Your task is to help with work-related questions.";

/// Inputs for one assembled prompt
#[derive(Debug, Clone, Default)]
pub struct PromptInputs {
    /// User profile description for the system turn
    pub profile: Option<String>,
    /// Compacted long-term memory context
    pub memory_context: String,
    /// Prior conversation turns, oldest first
    pub history: Vec<ChatMessage>,
    /// Retrieved document context, already concatenated
    pub context: String,
    /// The literal question
    pub question: String,
}

/// Assemble the ordered message list for the generation service.
///
/// `history_turns` caps how many trailing history turns survive; turns with
/// empty content are dropped before assembly.
pub fn assemble(inputs: PromptInputs, history_turns: usize) -> Vec<ChatMessage> {
    let mut system = String::from(SYSTEM_INSTRUCTIONS);
    if let Some(profile) = inputs.profile.as_deref() {
        if !profile.trim().is_empty() {
            system.push_str(" Here is the key information about the user: ");
            system.push_str(profile.trim());
        }
    }
    if !inputs.memory_context.trim().is_empty() {
        system.push_str("\nKnown from earlier conversations: ");
        system.push_str(inputs.memory_context.trim());
    }

    let mut messages = vec![ChatMessage::system(system)];

    let history: Vec<ChatMessage> = inputs
        .history
        .into_iter()
        .filter(|m| !m.content.trim().is_empty())
        .collect();
    let start = history.len().saturating_sub(history_turns);
    messages.extend(history.into_iter().skip(start));

    messages.push(ChatMessage::user(format!(
        "Context from documents: {}. Question: {}",
        inputs.context, inputs.question
    )));

    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_turn_comes_first() {
        let messages = assemble(
            PromptInputs {
                profile: Some("facilities manager".to_string()),
                memory_context: "prefers short answers".to_string(),
                question: "where is the boiler room?".to_string(),
                ..Default::default()
            },
            6,
        );

        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[0].content.contains("facilities manager"));
        assert!(messages[0].content.contains("prefers short answers"));
    }

    #[test]
    fn test_question_and_context_in_final_user_turn() {
        let messages = assemble(
            PromptInputs {
                context: "The boiler room is on level B2.".to_string(),
                question: "where is the boiler room?".to_string(),
                ..Default::default()
            },
            6,
        );

        let last = messages.last().unwrap();
        assert_eq!(last.role, ChatRole::User);
        assert!(last.content.contains("level B2"));
        assert!(last.content.contains("where is the boiler room?"));
    }

    #[test]
    fn test_empty_history_turns_dropped() {
        let history = vec![
            ChatMessage::user("first question"),
            ChatMessage::assistant("   "),
            ChatMessage::user("second question"),
        ];

        let messages = assemble(
            PromptInputs {
                history,
                question: "third question".to_string(),
                ..Default::default()
            },
            6,
        );

        // system + 2 surviving history turns + final user turn
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "first question");
        assert_eq!(messages[2].content, "second question");
    }

    #[test]
    fn test_history_capped_to_last_n_oldest_first() {
        let history: Vec<ChatMessage> = (0..10)
            .map(|i| ChatMessage::user(format!("turn {i}")))
            .collect();

        let messages = assemble(
            PromptInputs {
                history,
                question: "latest".to_string(),
                ..Default::default()
            },
            3,
        );

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[1].content, "turn 7");
        assert_eq!(messages[3].content, "turn 9");
    }

    #[test]
    fn test_blank_profile_omitted() {
        let messages = assemble(
            PromptInputs {
                profile: Some("   ".to_string()),
                question: "q".to_string(),
                ..Default::default()
            },
            6,
        );

        assert!(!messages[0].content.contains("key information"));
    }
}
