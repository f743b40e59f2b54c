pub mod chat;
pub mod document;
pub mod transcription;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AssistantError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    /// Plain string for text-only turns, or a content array mixing
    /// `{type: "text"}` and `{type: "image_url"}` items for screenshot turns.
    pub content: serde_json::Value,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: serde_json::Value::String(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: serde_json::Value::String(text.into()),
        }
    }

    pub fn user_with_images(text: &str, images: &[String]) -> Self {
        let mut content = vec![json!({ "type": "text", "text": text })];
        for image in images {
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": image }
            }));
        }
        Self {
            role: "user".to_string(),
            content: serde_json::Value::Array(content),
        }
    }
}

/// Seam between the orchestrator and the completion endpoint, so the
/// state machine can be exercised against an in-memory transport.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AssistantError>;
}

/// Check the status and decode the JSON body, mapping both failure shapes
/// onto the error taxonomy. Shared by the polling vendor clients.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    service: &'static str,
) -> Result<T, AssistantError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AssistantError::VendorTerminal {
            service,
            status: status.as_u16(),
            message: body,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| AssistantError::VendorFailure {
            service,
            message: format!("unexpected response body: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_with_images_builds_mixed_content() {
        let message = ChatMessage::user_with_images(
            "solve this",
            &[
                "data:image/png;base64,AAAA".to_string(),
                "data:image/png;base64,BBBB".to_string(),
            ],
        );
        assert_eq!(message.role, "user");
        let items = message.content.as_array().expect("content array");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["type"], "text");
        assert_eq!(items[1]["type"], "image_url");
        assert_eq!(items[2]["image_url"]["url"], "data:image/png;base64,BBBB");
    }
}
