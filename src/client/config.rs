use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_UPLOAD_LIMIT_MB: u64 = 10;

/// Settings of the client side, read from the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Optional AI proxy; absent means AI-assisted features are disabled
    pub ai_proxy_url: Option<String>,
    /// Uploads above this size are refused before any request is made
    pub upload_limit_mb: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            ai_proxy_url: None,
            upload_limit_mb: DEFAULT_UPLOAD_LIMIT_MB,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = env::var("LEXCRM_API_BASE_URL") {
            if !v.trim().is_empty() {
                config.api_base_url = v.trim().trim_end_matches('/').to_string();
            }
        }
        config.ai_proxy_url = env::var("LEXCRM_AI_PROXY_URL").ok().filter(|v| !v.trim().is_empty());
        if let Ok(v) = env::var("LEXCRM_UPLOAD_LIMIT_MB") {
            config.upload_limit_mb = v.parse().unwrap_or(config.upload_limit_mb);
        }
        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai_proxy_url.is_some()
    }

    pub fn upload_limit_bytes(&self) -> u64 {
        self.upload_limit_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_features_follow_proxy_presence() {
        let config = ClientConfig::default();
        assert!(!config.ai_enabled());
        let config = ClientConfig { ai_proxy_url: Some("http://localhost:9000".into()), ..config };
        assert!(config.ai_enabled());
        assert_eq!(config.upload_limit_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn huge_upload_limit_saturates() {
        let config = ClientConfig { upload_limit_mb: u64::MAX, ..ClientConfig::default() };
        assert_eq!(config.upload_limit_bytes(), u64::MAX);
    }
}
