use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration. Every vendor credential is optional: a missing
/// credential degrades the corresponding feature to an explicit user-visible
/// message (or a documented fallback) instead of a failed network attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chat_api_key: String,
    pub chat_api_url: String,
    pub chat_deployment_id: String,
    pub doc_intelligence_key: String,
    pub doc_intelligence_endpoint: String,
    pub speech_api_key: String,
    pub speech_api_url: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    pub oauth_redirect_uri: String,
    pub default_language: String,
    /// Free-tier gating. The counters only bite while this is on.
    pub enforce_usage_limits: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat_api_key: String::new(),
            chat_api_url: String::new(),
            chat_deployment_id: String::new(),
            doc_intelligence_key: String::new(),
            doc_intelligence_endpoint: String::new(),
            speech_api_key: String::new(),
            speech_api_url: "https://api.assemblyai.com".to_string(),
            oauth_client_id: String::new(),
            oauth_client_secret: String::new(),
            oauth_redirect_uri: "http://localhost:3005/auth-callback".to_string(),
            default_language: "Java".to_string(),
            enforce_usage_limits: false,
        }
    }
}

impl AppConfig {
    pub fn load(config_dir: &Path) -> Self {
        let config_path = config_dir.join("config.json");
        let mut config = if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
                Err(_) => Self::default(),
            }
        } else {
            let c = Self::default();
            c.save(config_dir);
            c
        };

        config.apply_env_overrides();
        config
    }

    /// Load from the platform config dir, falling back to env-only config
    /// when no config dir is available.
    pub fn load_default() -> Self {
        match dirs::config_dir() {
            Some(base) => {
                let dir = base.join("deskpilot");
                std::fs::create_dir_all(&dir).ok();
                Self::load(&dir)
            }
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                config
            }
        }
    }

    pub fn save(&self, config_dir: &Path) {
        let config_path = config_dir.join("config.json");
        if let Ok(content) = serde_json::to_string_pretty(self) {
            std::fs::write(config_path, content).ok();
        }
    }

    // Environment variables win over the config file (more secure than
    // keeping keys on disk).
    fn apply_env_overrides(&mut self) {
        override_from_env(&mut self.chat_api_key, "CHAT_API_KEY");
        override_from_env(&mut self.chat_api_url, "CHAT_API_URL");
        override_from_env(&mut self.chat_deployment_id, "CHAT_DEPLOYMENT_ID");
        override_from_env(&mut self.doc_intelligence_key, "DOC_INTELLIGENCE_KEY");
        override_from_env(
            &mut self.doc_intelligence_endpoint,
            "DOC_INTELLIGENCE_ENDPOINT",
        );
        override_from_env(&mut self.speech_api_key, "SPEECH_API_KEY");
        override_from_env(&mut self.speech_api_url, "SPEECH_API_URL");
        override_from_env(&mut self.oauth_client_id, "GOOGLE_CLIENT_ID");
        override_from_env(&mut self.oauth_client_secret, "GOOGLE_CLIENT_SECRET");
        override_from_env(&mut self.oauth_redirect_uri, "OAUTH_REDIRECT_URI");
        if let Ok(value) = std::env::var("ENFORCE_USAGE_LIMITS") {
            self.enforce_usage_limits = matches!(value.as_str(), "1" | "true" | "yes");
        }
    }

    pub fn has_chat_config(&self) -> bool {
        !self.chat_api_key.is_empty()
            && !self.chat_api_url.is_empty()
            && !self.chat_deployment_id.is_empty()
    }

    pub fn has_document_analysis(&self) -> bool {
        !self.doc_intelligence_key.is_empty() && !self.doc_intelligence_endpoint.is_empty()
    }

    pub fn has_speech_config(&self) -> bool {
        !self.speech_api_key.is_empty()
    }

    pub fn has_oauth_config(&self) -> bool {
        !self.oauth_client_id.is_empty() && !self.oauth_client_secret.is_empty()
    }
}

fn override_from_env(slot: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            *slot = value;
        }
    }
}
