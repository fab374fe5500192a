//! SQLite persistence for Reverie.
//!
//! Stores Telegram users (with their Gemini API key) and their saved
//! character/persona profiles. Conversation history is deliberately not
//! persisted; a chat session lives and dies with the process.

mod sqlite;

pub use sqlite::{ProfileKind, ProfileRecord, SqliteStore, UserRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("unknown user: {0}")]
    UnknownUser(i64),
}

pub type Result<T> = std::result::Result<T, StoreError>;
