//! Per-user dialogue state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use reverie_ai::{ChatSession, Profile};
use reverie_store::ProfileKind;

/// Where a user currently is in a multi-step bot conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    Idle,
    AwaitingApiKey,
    AwaitingProfileName { kind: ProfileKind },
    AwaitingProfilePrompt { kind: ProfileKind, name: String },
}

/// Everything the bot tracks for one Telegram user between updates.
/// Not persisted; a restart forgets selections and live chats.
pub struct UserState {
    pub state: DialogueState,
    pub active_character: Option<Profile>,
    pub active_persona: Option<Profile>,
    pub chat: Option<ChatSession>,
}

impl UserState {
    fn new() -> Self {
        Self {
            state: DialogueState::Idle,
            active_character: None,
            active_persona: None,
            chat: None,
        }
    }
}

/// What a free-text message should do, decided from the dialogue state.
/// Routing is pure so the state machine is testable without a network.
#[derive(Debug, PartialEq, Eq)]
pub enum TextAction {
    RegisterKey(String),
    AskProfilePrompt {
        kind: ProfileKind,
    },
    SaveProfile {
        kind: ProfileKind,
        name: String,
        prompt: String,
    },
    Converse(String),
}

/// Advance the dialogue with one free-text input.
pub fn route_text(user: &mut UserState, text: &str) -> TextAction {
    match std::mem::replace(&mut user.state, DialogueState::Idle) {
        DialogueState::AwaitingApiKey => {
            // Stays armed until a key validates; the handler resets it.
            user.state = DialogueState::AwaitingApiKey;
            TextAction::RegisterKey(text.trim().to_string())
        }
        DialogueState::AwaitingProfileName { kind } => {
            user.state = DialogueState::AwaitingProfilePrompt {
                kind,
                name: text.trim().to_string(),
            };
            TextAction::AskProfilePrompt { kind }
        }
        DialogueState::AwaitingProfilePrompt { kind, name } => TextAction::SaveProfile {
            kind,
            name,
            prompt: text.trim().to_string(),
        },
        DialogueState::Idle => TextAction::Converse(text.to_string()),
    }
}

/// All live user states, one async mutex per user.
///
/// Handlers hold the per-user lock for the whole update, including across
/// the model call, so at most one `get_response` is in flight per session.
#[derive(Default)]
pub struct Dialogues {
    map: Mutex<HashMap<i64, Arc<Mutex<UserState>>>>,
}

impl Dialogues {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entry(&self, user_id: i64) -> Arc<Mutex<UserState>> {
        let mut map = self.map.lock().await;
        map.entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(UserState::new())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_user() -> UserState {
        UserState::new()
    }

    #[test]
    fn idle_text_converses_untrimmed() {
        let mut user = idle_user();
        let action = route_text(&mut user, "  hello there  ");
        assert_eq!(action, TextAction::Converse("  hello there  ".into()));
        assert_eq!(user.state, DialogueState::Idle);
    }

    #[test]
    fn api_key_state_survives_until_handler_resets() {
        let mut user = idle_user();
        user.state = DialogueState::AwaitingApiKey;
        let action = route_text(&mut user, " AIza-key ");
        assert_eq!(action, TextAction::RegisterKey("AIza-key".into()));
        assert_eq!(user.state, DialogueState::AwaitingApiKey);
    }

    #[test]
    fn profile_creation_walks_name_then_prompt() {
        let mut user = idle_user();
        user.state = DialogueState::AwaitingProfileName {
            kind: ProfileKind::Character,
        };

        let action = route_text(&mut user, "Sunday");
        assert_eq!(
            action,
            TextAction::AskProfilePrompt {
                kind: ProfileKind::Character
            }
        );
        assert_eq!(
            user.state,
            DialogueState::AwaitingProfilePrompt {
                kind: ProfileKind::Character,
                name: "Sunday".into()
            }
        );

        let action = route_text(&mut user, "calm and wise");
        assert_eq!(
            action,
            TextAction::SaveProfile {
                kind: ProfileKind::Character,
                name: "Sunday".into(),
                prompt: "calm and wise".into()
            }
        );
        assert_eq!(user.state, DialogueState::Idle);
    }

    #[tokio::test]
    async fn entry_returns_the_same_state_per_user() {
        let dialogues = Dialogues::new();
        let a = dialogues.entry(1).await;
        let b = dialogues.entry(1).await;
        let other = dialogues.entry(2).await;

        a.lock().await.state = DialogueState::AwaitingApiKey;
        assert_eq!(b.lock().await.state, DialogueState::AwaitingApiKey);
        assert_eq!(other.lock().await.state, DialogueState::Idle);
    }
}
