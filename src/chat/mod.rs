//! One document-grounded chat turn
//!
//! Orchestrates retrieve → rerank → annotate → assemble → generate → persist.
//! Every downstream failure short of the database degrades the turn instead
//! of failing it: retrieval problems shrink the context to a note, generation
//! problems become a textual error reply, and permission or accounting
//! problems only lose their side effect.

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::generate::Generator;
use crate::memory::MemoryStore;
use crate::meta::MetaDb;
use crate::permissions::{annotate_access, DocAccess};
use crate::prompt::{assemble, ChatMessage, PromptInputs};
use crate::rerank::Reranker;
use crate::search::search_and_rerank;
use crate::store::VectorIndex;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// Options for one chat turn
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Existing chat to continue; a new chat is created when absent
    pub chat_id: Option<i64>,
    /// Override the number of context chunks
    pub top_k: Option<usize>,
}

/// Result of one chat turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub chat_id: i64,
    pub reply: String,
    /// The document context that was handed to the generation service
    pub context: String,
    /// Advisory per-document access flags, retrieval rank order
    pub doc_access: Vec<DocAccess>,
    pub reasoning: Option<Value>,
    /// True when retrieval or generation fell back to a degraded path
    pub degraded: bool,
}

/// Run one chat turn for a user.
///
/// Both turns are persisted and the interaction is folded into long-term
/// memory before returning.
#[allow(clippy::too_many_arguments)]
pub async fn run_chat_turn(
    db: &MetaDb,
    memory: &MemoryStore,
    embedder: &dyn Embedder,
    reranker: Option<&dyn Reranker>,
    index: &dyn VectorIndex,
    generator: &dyn Generator,
    config: &Config,
    user_id: i64,
    question: &str,
    options: &ChatOptions,
) -> Result<ChatOutcome> {
    let user = db
        .get_user(user_id)
        .await?
        .ok_or(Error::UserNotFound(user_id))?;

    let chat = match options.chat_id {
        Some(id) => db.get_chat(id).await?.ok_or(Error::ChatNotFound(id))?,
        None => {
            db.create_chat(user_id, &format!("Chat with {}", user.name))
                .await?
        }
    };

    let history: Vec<ChatMessage> = db
        .recent_messages(chat.id, config.generation.history_turns)
        .await?
        .into_iter()
        .map(|m| {
            if m.sender {
                ChatMessage::assistant(m.body)
            } else {
                ChatMessage::user(m.body)
            }
        })
        .collect();

    let top_k = options.top_k.unwrap_or(config.query.top_k);
    let (chunks, context, retrieval_degraded) = match search_and_rerank(
        embedder,
        reranker,
        index,
        &config.query,
        question,
        top_k,
    )
    .await
    {
        Ok(chunks) => {
            let context = chunks
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            (chunks, context, false)
        }
        Err(e) => {
            warn!("Retrieval failed, continuing with empty context: {}", e);
            (
                Vec::new(),
                format!("Document context unavailable: {}", e),
                true,
            )
        }
    };

    let doc_access = annotate_access(db, user_id, &chunks).await;

    for access in &doc_access {
        if let Err(e) = db.record_doc_call(user_id, access.doc_id).await {
            warn!(
                "Could not record document call for user {} doc {}: {}",
                user_id, access.doc_id, e
            );
        }
    }

    let memory_context = match memory.get_context(user_id).await {
        Ok(context) => context,
        Err(e) => {
            warn!("Memory lookup failed for user {}: {}", user_id, e);
            String::new()
        }
    };

    let messages = assemble(
        PromptInputs {
            profile: user.description.clone(),
            memory_context,
            history,
            context: context.clone(),
            question: question.to_string(),
        },
        config.generation.history_turns,
    );

    let (reply, reasoning, generation_degraded) = match generator.complete(&messages).await {
        Ok(completion) => (completion.content, completion.reasoning, false),
        Err(e) => {
            warn!("Generation failed, returning degraded reply: {}", e);
            (format!("AI request failed: {}", e), None, true)
        }
    };

    db.insert_message(chat.id, question, false).await?;
    db.insert_message(chat.id, &reply, true).await?;

    if let Err(e) = memory.record_interaction(user_id, question, &reply).await {
        warn!("Could not update memory for user {}: {}", user_id, e);
    }

    info!(
        "Chat turn complete for user {} in chat {} ({} context documents)",
        user_id,
        chat.id,
        doc_access.len()
    );

    Ok(ChatOutcome {
        chat_id: chat.id,
        reply,
        context,
        doc_access,
        reasoning,
        degraded: retrieval_degraded || generation_degraded,
    })
}
