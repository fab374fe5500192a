//! ChatSession struct, client lifecycle, and history management.

use std::sync::Arc;

use tracing::debug;

use crate::gemini::{GeminiClient, GeminiConfig};
use crate::prompt::{self, Profile};
use crate::{AiClient, Message, Role};

/// Builds a model client from an API key. Injectable so tests can substitute
/// a stub backend.
pub type ClientFactory = Box<dyn Fn(&str) -> Arc<dyn AiClient> + Send + Sync>;

/// Binding between a built client and the system prompt it was built for.
/// Any profile change resets to `Uninitialized`, so a stale prompt can never
/// be paired with a live client.
pub(super) enum ClientState {
    Uninitialized,
    Ready {
        client: Arc<dyn AiClient>,
        system_prompt: String,
    },
}

/// A conversation with one character/persona pairing.
///
/// History is a faithful transcript: append-only, never reordered, cleared
/// only by [`ChatSession::clear_history`]. At most one `get_response` may be
/// in flight per session; `&mut self` enforces this within a task, and
/// multi-user callers wrap each session in its own lock.
pub struct ChatSession {
    pub(super) api_key: String,
    pub(super) character: Option<Profile>,
    pub(super) persona: Option<Profile>,
    pub(super) history: Vec<Message>,
    pub(super) state: ClientState,
    pub(super) factory: ClientFactory,
}

fn gemini_factory(api_key: &str) -> Arc<dyn AiClient> {
    Arc::new(GeminiClient::new(GeminiConfig::new(api_key)))
}

impl ChatSession {
    /// Create a session backed by the Gemini API.
    pub fn new(
        api_key: impl Into<String>,
        character: Option<Profile>,
        persona: Option<Profile>,
    ) -> Self {
        Self::with_client_factory(api_key, character, persona, Box::new(gemini_factory))
    }

    /// Create a session with a custom model-client factory.
    pub fn with_client_factory(
        api_key: impl Into<String>,
        character: Option<Profile>,
        persona: Option<Profile>,
        factory: ClientFactory,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            character,
            persona,
            history: Vec::new(),
            state: ClientState::Uninitialized,
            factory,
        }
    }

    /// Bind a model client to the current profiles if none is bound yet.
    /// Invoked at the top of every `get_response`; a no-op when Ready.
    pub fn ensure_ready(&mut self) {
        if matches!(self.state, ClientState::Ready { .. }) {
            return;
        }
        let system_prompt =
            prompt::system_prompt(self.character.as_ref(), self.persona.as_ref());
        debug!("binding model client");
        self.state = ClientState::Ready {
            client: (self.factory)(&self.api_key),
            system_prompt,
        };
    }

    /// Append a turn to history. No validation beyond presence.
    pub fn add_to_history(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(Message {
            role,
            content: content.into(),
        });
    }

    /// Replace the active character. The bound client becomes stale and is
    /// rebuilt on the next call; history is preserved.
    pub fn update_character(&mut self, character: Profile) {
        self.character = Some(character);
        self.state = ClientState::Uninitialized;
    }

    /// Replace the active persona. Same invalidation rules as
    /// [`ChatSession::update_character`].
    pub fn update_persona(&mut self, persona: Profile) {
        self.persona = Some(persona);
        self.state = ClientState::Uninitialized;
    }

    /// Reset history to empty. Profiles and client binding are untouched.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// The full conversation transcript.
    pub fn history(&self) -> &[Message] {
        &self.history
    }
}
