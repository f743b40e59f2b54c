//! OAuth login at its interface boundary: the browser delivers an
//! authorization code, this client exchanges it for a token and fetches the
//! profile. The callback server itself belongs to the host shell.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::decode_json;
use crate::config::AppConfig;
use crate::error::AssistantError;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const PROFILE_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub picture: String,
    pub sub: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct AuthClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl AuthClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            client_id: config.oauth_client_id.clone(),
            client_secret: config.oauth_client_secret.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
        }
    }

    /// URL the host shell opens in the system browser.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=profile%20email",
            AUTH_URL, self.client_id, self.redirect_uri
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<String, AssistantError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(AssistantError::ConfigurationMissing { feature: "oauth" });
        }

        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AssistantError::VendorTransient {
                service: "oauth",
                reason: e.to_string(),
            })?;
        let token: TokenResponse = decode_json(response, "oauth").await?;
        Ok(token.access_token)
    }

    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AssistantError> {
        let response = self
            .client
            .get(PROFILE_URL)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| AssistantError::VendorTransient {
                service: "oauth",
                reason: e.to_string(),
            })?;
        decode_json(response, "oauth").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_and_redirect() {
        let mut config = AppConfig::default();
        config.oauth_client_id = "client-123".to_string();
        let auth = AuthClient::new(&config);
        let url = auth.authorize_url();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http://localhost:3005/auth-callback"));
        assert!(url.contains("response_type=code"));
    }

    #[tokio::test]
    async fn exchange_without_credentials_fails_eagerly() {
        let auth = AuthClient::new(&AppConfig::default());
        let err = auth.exchange_code("abc").await;
        assert!(matches!(
            err,
            Err(AssistantError::ConfigurationMissing { feature: "oauth" })
        ));
    }
}
