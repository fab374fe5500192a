//! AiClient trait implementation for GeminiClient, plus key validation.

use async_trait::async_trait;
use tracing::debug;

use crate::{AiClient, AiError, Message, Role};

use super::client::GeminiClient;
use super::config::GeminiConfig;

#[async_trait]
impl AiClient for GeminiClient {
    async fn send_message(&self, messages: &[Message]) -> Result<String, AiError> {
        let body = self.build_request_body(messages);
        let url = self.api_url();

        debug!(model = %self.config.model, "Gemini API request");

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AiError::ApiError(format!("HTTP {status}: {text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::ParseError(e.to_string()))?;

        self.parse_response(json)
    }
}

/// Probe an API key with a one-shot completion.
///
/// Any failure counts as invalid. Runs once before a key is persisted; the
/// chat session itself never validates credentials.
pub async fn validate_key(api_key: &str) -> bool {
    let client = GeminiClient::new(GeminiConfig::new(api_key));
    let probe = [Message {
        role: Role::User,
        content: "Test".into(),
    }];
    client.send_message(&probe).await.is_ok()
}
