//! SQLite schema definition

/// SQL schema for the metadata database
pub const SCHEMA_SQL: &str = r#"
-- Users: chat participants with an optional profile description
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL
);

-- Chats: one conversation thread per row
CREATE TABLE IF NOT EXISTS chats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Messages: conversation turns; sender 0 = user, 1 = assistant
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL REFERENCES chats(id),
    body TEXT NOT NULL,
    sender INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- Long-term memory: compacted to a single record per user on write
CREATE TABLE IF NOT EXISTS llm_memory (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    info TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Document permissions: presence of a row grants access
CREATE TABLE IF NOT EXISTS doc_permissions (
    user_id INTEGER NOT NULL,
    doc_id INTEGER NOT NULL,
    PRIMARY KEY (user_id, doc_id)
);

-- Document access accounting per user
CREATE TABLE IF NOT EXISTS doc_calls (
    user_id INTEGER NOT NULL,
    doc_id INTEGER NOT NULL,
    call_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, doc_id)
);

-- Build runs: index rebuild history
CREATE TABLE IF NOT EXISTS build_runs (
    id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    status TEXT NOT NULL,
    docs_processed INTEGER DEFAULT 0,
    points_written INTEGER DEFAULT 0,
    errors_json TEXT
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id);
CREATE INDEX IF NOT EXISTS idx_memory_user ON llm_memory(user_id);
CREATE INDEX IF NOT EXISTS idx_chats_user ON chats(user_id);
"#;
