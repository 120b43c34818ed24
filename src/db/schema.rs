//! SQL schema definitions

pub const SCHEMA: &str = r#"
-- One serialized session aggregate per conversation
CREATE TABLE IF NOT EXISTS sessions (
    conversation_id INTEGER PRIMARY KEY,
    data TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
