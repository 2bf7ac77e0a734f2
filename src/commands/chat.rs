//! Chat command implementation

use crate::chat::{run_chat_turn, ChatOptions, ChatOutcome};
use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::generate::Generator;
use crate::memory::MemoryStore;
use crate::meta::MetaDb;
use crate::rerank::Reranker;
use crate::store::VectorIndex;

/// Run one chat turn end to end
#[allow(clippy::too_many_arguments)]
pub async fn cmd_chat(
    config: &Config,
    db: &MetaDb,
    embedder: &dyn Embedder,
    reranker: Option<&dyn Reranker>,
    index: &dyn VectorIndex,
    generator: &dyn Generator,
    user_id: i64,
    message: &str,
    options: ChatOptions,
) -> Result<ChatOutcome> {
    let memory = MemoryStore::new(db.clone(), config.memory.clone());

    run_chat_turn(
        db, &memory, embedder, reranker, index, generator, config, user_id, message, &options,
    )
    .await
}

/// Print a chat outcome to console
pub fn print_chat_outcome(outcome: &ChatOutcome) {
    println!("\n[chat {}]", outcome.chat_id);
    if outcome.degraded {
        println!("(degraded response)");
    }
    println!("{}\n", outcome.reply);

    if !outcome.doc_access.is_empty() {
        println!("Context documents:");
        for access in &outcome.doc_access {
            let marker = if access.permitted { "granted" } else { "no access" };
            println!("  - document {} ({})", access.doc_id, marker);
        }
    }
}
