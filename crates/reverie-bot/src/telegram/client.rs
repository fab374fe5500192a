//! Bot API client: request plumbing, long polling, and outgoing calls.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::types::{InlineKeyboardMarkup, ReplyMarkup, TgMessage, Update};

pub(crate) const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API client.
pub struct TelegramClient {
    token: String,
    http: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            http: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                // Must stay above the long-poll timeout passed to getUpdates.
                .timeout(Duration::from_secs(60))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{}/{method}", self.token)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TelegramError> {
        debug!(method, "Telegram API request");

        let response = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| TelegramError::Network(e.to_string()))?;

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Parse(e.to_string()))?;

        if !envelope.ok {
            return Err(TelegramError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| "unknown error".into()),
            ));
        }
        envelope
            .result
            .ok_or_else(|| TelegramError::Parse("missing result".into()))
    }

    /// Long-poll for updates past `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<TgMessage, TelegramError> {
        self.call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await
    }

    pub async fn send_message_with_markup(
        &self,
        chat_id: i64,
        text: &str,
        markup: &ReplyMarkup,
    ) -> Result<TgMessage, TelegramError> {
        self.call(
            "sendMessage",
            json!({ "chat_id": chat_id, "text": text, "reply_markup": markup }),
        )
        .await
    }

    /// Edit a previously sent message, optionally swapping its inline keyboard.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let mut body = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(markup) = markup {
            body["reply_markup"] =
                serde_json::to_value(markup).map_err(|e| TelegramError::Parse(e.to_string()))?;
        }
        // Returns the edited Message, or `true` for inline-mode messages.
        self.call::<serde_json::Value>("editMessageText", body)
            .await?;
        Ok(())
    }

    pub async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), TelegramError> {
        let mut body = json!({ "callback_query_id": callback_id, "show_alert": show_alert });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        self.call::<bool>("answerCallbackQuery", body).await?;
        Ok(())
    }
}
