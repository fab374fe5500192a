//! LLM engine for Reverie.
//!
//! Provides the Gemini API client and the roleplay chat session:
//! - System-prompt composition from character/persona profiles
//! - Conversation history with lazy model-client binding
//! - Quota-aware fallback messages for failed completions

pub mod gemini;
pub mod prompt;
pub mod session;

use async_trait::async_trait;

pub use gemini::{validate_key, GeminiClient, GeminiConfig};
pub use prompt::{character_info, Profile};
pub use session::{fallback_message, ChatSession, ClientFactory};

/// A model backend able to complete one chat exchange.
///
/// `messages` carries the system prompt first (if any), then the transcript
/// in order, ending with the newest user message.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn send_message(&self, messages: &[Message]) -> Result<String, AiError>;
}

/// One recorded turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("API error: {0}")]
    ApiError(String),
    /// The provider rejected the call due to rate/usage limits.
    #[error("Rate limited")]
    RateLimited,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
