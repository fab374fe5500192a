//! Gemini API client struct, request building, and response parsing.

use crate::{AiError, Message, Role};

use super::config::GeminiConfig;

pub(crate) const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client.
pub struct GeminiClient {
    pub(crate) config: GeminiConfig,
    pub(crate) http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    pub(crate) fn api_url(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.config.model)
    }

    /// Build the JSON request body for the Gemini API.
    ///
    /// User turns map to role `user`, assistant turns to role `model`; the
    /// system message is carried in `systemInstruction` rather than the
    /// contents list.
    pub(crate) fn build_request_body(&self, messages: &[Message]) -> serde_json::Value {
        let mut contents = Vec::new();

        for msg in messages {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "model",
                Role::System => continue,
            };
            contents.push(serde_json::json!({
                "role": role,
                "parts": [{ "text": msg.content }]
            }));
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": self.config.max_tokens,
                "temperature": self.config.temperature,
            }
        });

        for msg in messages {
            if msg.role == Role::System {
                body["systemInstruction"] = serde_json::json!({
                    "parts": [{ "text": msg.content }]
                });
                break;
            }
        }

        body
    }

    /// Extract the reply text from a Gemini response: the concatenated text
    /// parts of the first candidate.
    pub(crate) fn parse_response(&self, json: serde_json::Value) -> Result<String, AiError> {
        let candidates = json["candidates"]
            .as_array()
            .ok_or_else(|| AiError::ParseError("no candidates in response".to_string()))?;

        let first = candidates
            .first()
            .ok_or_else(|| AiError::ParseError("empty candidates".to_string()))?;

        let parts = first["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut content = String::new();
        for part in &parts {
            if let Some(text) = part["text"].as_str() {
                content.push_str(text);
            }
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(GeminiConfig::new("key"))
    }

    fn conversation() -> Vec<Message> {
        vec![
            Message {
                role: Role::System,
                content: "stay in character".into(),
            },
            Message {
                role: Role::User,
                content: "Hello".into(),
            },
            Message {
                role: Role::Assistant,
                content: "Hi there".into(),
            },
        ]
    }

    #[test]
    fn request_body_maps_roles_and_system_instruction() {
        let body = client().build_request_body(&conversation());

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Hello");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "Hi there");

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "stay in character"
        );
        assert_eq!(body["generationConfig"]["temperature"], 0.7);
    }

    #[test]
    fn response_parts_concatenate() {
        let json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "\"Hello, user!\" " },
                        { "text": "he smiled back." }
                    ]
                }
            }]
        });
        let reply = client().parse_response(json).unwrap();
        assert_eq!(reply, "\"Hello, user!\" he smiled back.");
    }

    #[test]
    fn missing_candidates_is_a_parse_error() {
        let err = client()
            .parse_response(serde_json::json!({ "error": {} }))
            .unwrap_err();
        assert!(matches!(err, AiError::ParseError(_)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", GeminiConfig::new("secret-key"));
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
