use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::AssistantError;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLL_ATTEMPTS: u64 = 60;
const SERVICE: &str = "transcription";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    text: Option<String>,
    error: Option<String>,
}

/// Client for the upload/submit/poll transcription vendor.
pub struct TranscriptionClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TranscriptionClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.speech_api_key.clone(),
            base_url: config.speech_api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Turn a captured audio clip into text. Polls the job status every 2s,
    /// bounded at 60 attempts before surfacing a typed timeout.
    pub async fn transcribe(&self, audio: Vec<u8>) -> Result<String, AssistantError> {
        if self.api_key.is_empty() {
            return Err(AssistantError::ConfigurationMissing {
                feature: "transcription",
            });
        }

        // 1. Upload the raw audio bytes, getting back a reference URL.
        let response = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header("authorization", &self.api_key)
            .body(audio)
            .send()
            .await
            .map_err(|e| AssistantError::VendorTransient {
                service: SERVICE,
                reason: e.to_string(),
            })?;
        let upload: UploadResponse = super::decode_json(response, SERVICE).await?;

        // 2. Submit the reference URL as a transcription job.
        let response = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&json!({ "audio_url": upload.upload_url }))
            .send()
            .await
            .map_err(|e| AssistantError::VendorTransient {
                service: SERVICE,
                reason: e.to_string(),
            })?;
        let job: CreateResponse = super::decode_json(response, SERVICE).await?;

        // 3. Poll until the job reaches a terminal status.
        for _ in 0..MAX_POLL_ATTEMPTS {
            tokio::time::sleep(POLL_INTERVAL).await;

            let response = self
                .client
                .get(format!("{}/v2/transcript/{}", self.base_url, job.id))
                .header("authorization", &self.api_key)
                .send()
                .await
                .map_err(|e| AssistantError::VendorTransient {
                    service: SERVICE,
                    reason: e.to_string(),
                })?;
            let poll: PollResponse = super::decode_json(response, SERVICE).await?;

            match poll.status.as_str() {
                "completed" => return Ok(poll.text.unwrap_or_default()),
                "failed" | "error" => {
                    return Err(AssistantError::VendorFailure {
                        service: SERVICE,
                        message: poll
                            .error
                            .unwrap_or_else(|| "the transcription job failed".to_string()),
                    });
                }
                other => log::debug!("transcription job {} still {}", job.id, other),
            }
        }

        Err(AssistantError::Timeout {
            service: SERVICE,
            waited_secs: MAX_POLL_ATTEMPTS * POLL_INTERVAL.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_before_any_network_call() {
        let client = TranscriptionClient::new(&AppConfig::default());
        let err = client.transcribe(vec![0u8; 16]).await;
        assert!(matches!(
            err,
            Err(AssistantError::ConfigurationMissing {
                feature: "transcription"
            })
        ));
    }
}
