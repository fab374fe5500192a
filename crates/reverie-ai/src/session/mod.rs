//! Roleplay chat session management.
//!
//! A `ChatSession` holds the conversation history, lazily binds a model
//! client to the system prompt composed from the active profiles, and maps
//! completion failures to user-facing fallback text.

mod chat;
mod manager;

pub use chat::fallback_message;
pub use manager::{ChatSession, ClientFactory};
