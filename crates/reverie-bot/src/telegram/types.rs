//! Typed subset of the Telegram Bot API schema.
//!
//! Incoming types deserialize only the fields the bot reads; Telegram sends
//! many more, which serde ignores.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TgUser>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TgUser,
    #[serde(default)]
    pub message: Option<TgMessage>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Outgoing `reply_markup`: either an inline keyboard attached to a message
/// or a persistent reply keyboard.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Keyboard(ReplyKeyboardMarkup),
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_field_placeholder: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_with_message_parses() {
        let json = r#"{
            "update_id": 10001,
            "message": {
                "message_id": 55,
                "from": { "id": 12345, "is_bot": false, "first_name": "Stelle", "last_name": "T" },
                "chat": { "id": 12345, "type": "private" },
                "date": 1714000000,
                "text": "Hello"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 10001);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 12345);
        assert_eq!(message.text.as_deref(), Some("Hello"));
        let from = message.from.unwrap();
        assert_eq!(from.first_name, "Stelle");
        assert_eq!(from.last_name.as_deref(), Some("T"));
        assert!(update.callback_query.is_none());
    }

    #[test]
    fn update_with_callback_query_parses() {
        let json = r#"{
            "update_id": 10002,
            "callback_query": {
                "id": "4382abc",
                "from": { "id": 12345, "is_bot": false, "first_name": "Stelle" },
                "message": {
                    "message_id": 56,
                    "chat": { "id": 12345, "type": "private" },
                    "date": 1714000001
                },
                "data": "select_char_3"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let callback = update.callback_query.unwrap();
        assert_eq!(callback.id, "4382abc");
        assert_eq!(callback.from.id, 12345);
        assert_eq!(callback.data.as_deref(), Some("select_char_3"));
        assert_eq!(callback.message.unwrap().message_id, 56);
    }

    #[test]
    fn non_text_message_parses_with_no_text() {
        let json = r#"{
            "update_id": 10003,
            "message": {
                "message_id": 57,
                "chat": { "id": 12345, "type": "private" },
                "date": 1714000002,
                "sticker": { "file_id": "abc" }
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert!(update.message.unwrap().text.is_none());
    }
}
