//! AI service configuration.
//!
//! Read once at client construction. Missing required values fail fast with a
//! descriptive error — a pipeline without credentials cannot do anything.

use std::time::Duration;

use thiserror::Error;

/// Default Gemini generateContent endpoint.
pub const DEFAULT_API_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

/// Model identifier reported in metadata.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is required in environment variables")]
    MissingApiKey,

    #[error("GEMINI_API_URL is required in environment variables")]
    MissingApiUrl,
}

/// Connection settings for the upstream generation API.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub api_url: String,
    /// Per-attempt bound; the in-flight request is cancelled when it elapses.
    pub timeout: Duration,
    pub max_retries: u32,
    pub model: String,
}

impl AiConfig {
    /// Config with defaults for everything except the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Read configuration from `GEMINI_*` environment variables.
    ///
    /// `GEMINI_API_KEY` is required; the rest fall back to defaults.
    /// Unparseable numeric values also fall back rather than failing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let api_url = std::env::var("GEMINI_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_ms = std::env::var("GEMINI_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        let max_retries = std::env::var("GEMINI_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        Ok(Self {
            api_key,
            api_url,
            timeout: Duration::from_millis(timeout_ms),
            max_retries,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Check that required values are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::MissingApiUrl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults() {
        let config = AiConfig::new("test-key");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.model, "gemini-1.5-flash");
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(AiConfig::new("test-key").validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_key() {
        let config = AiConfig::new("  ");
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn validate_rejects_empty_url() {
        let mut config = AiConfig::new("test-key");
        config.api_url = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiUrl)));
    }

    #[test]
    fn config_error_messages_name_the_variable() {
        assert!(ConfigError::MissingApiKey
            .to_string()
            .contains("GEMINI_API_KEY"));
        assert!(ConfigError::MissingApiUrl
            .to_string()
            .contains("GEMINI_API_URL"));
    }
}
