//! Wire types for the LLM and token endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions/context)
    System,
    /// User message
    User,
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Request body for the generation endpoint
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub input: Vec<Message>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, system: &str, user: &str) -> Self {
        Self {
            model: model.into(),
            input: vec![Message::system(system), Message::user(user)],
        }
    }
}

/// Pull the generated text out of a response body
///
/// Tries, in order: `choices[0].message.content`, a top-level `content`
/// string, a top-level `output` string, and finally the first text part of
/// an `output` message list.
pub fn extract_content(body: &Value) -> Option<String> {
    let non_empty = |v: &Value| v.as_str().filter(|s| !s.trim().is_empty()).map(str::to_string);

    body.pointer("/choices/0/message/content")
        .and_then(non_empty)
        .or_else(|| body.get("content").and_then(non_empty))
        .or_else(|| body.get("output").and_then(non_empty))
        .or_else(|| {
            body.get("output")?
                .as_array()?
                .iter()
                .filter_map(|item| item.get("content")?.as_array())
                .flatten()
                .find_map(|part| part.get("text").and_then(non_empty))
        })
}

/// Request body for the token endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub flow_id: Option<String>,
    pub environment: String,
    pub user_id: Option<String>,
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Lifetime in seconds, when the endpoint states one
    #[serde(default, alias = "expiresIn")]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// The issued token under either field name
    pub fn into_token(self) -> Option<String> {
        self.token
            .or(self.access_token)
            .filter(|t| !t.trim().is_empty())
    }
}
