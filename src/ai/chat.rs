use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatMessage, ChatTransport};
use crate::config::AppConfig;
use crate::error::AssistantError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const API_VERSION: &str = "2024-02-15-preview";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 1500;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// HTTP client for the deployment-style chat-completion endpoint.
pub struct ChatClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl ChatClient {
    pub fn new(config: &AppConfig) -> Self {
        let endpoint = format!(
            "{}openai/deployments/{}/chat/completions?api-version={}",
            config.chat_api_url, config.chat_deployment_id, API_VERSION
        );
        Self {
            client: Client::new(),
            api_key: config.chat_api_key.clone(),
            endpoint,
        }
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AssistantError> {
        let request = CompletionRequest {
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::VendorTransient {
                service: "completion",
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the vendor's structured error message when the body has one.
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(AssistantError::VendorTerminal {
                service: "completion",
                status: status.as_u16(),
                message,
            });
        }

        let body: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| AssistantError::VendorFailure {
                    service: "completion",
                    message: format!("unexpected response format: {}", e),
                })?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AssistantError::VendorFailure {
                service: "completion",
                message: "response contained no choices".to_string(),
            })
    }
}
