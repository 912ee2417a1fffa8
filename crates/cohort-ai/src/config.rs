//! Configuration for the generation service.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GenerationError, Result};
use crate::orchestrator::{MAX_ATTEMPTS, RetryPolicy};

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default REST endpoint of the generation service.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";

/// Settings for talking to the generation service.
///
/// Every field has a default, so an empty file (or no file) is valid; only
/// the API key must come from somewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL; the model path is appended to it.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Overridden by [`API_KEY_ENV`] when that is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per call, including the first. Values above
    /// [`MAX_ATTEMPTS`] are lowered to it, and zero is raised to one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_max_attempts() -> u32 {
    MAX_ATTEMPTS
}

const fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl AiConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| GenerationError::Config(e.to_string()))
    }

    /// Loads the configuration file, if any, then applies the environment
    /// override for the API key.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    GenerationError::Config(format!("failed to read {}: {e}", path.display()))
                })?;
                debug!(path = %path.display(), "loaded AI configuration");
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        Ok(config.with_api_key_override(std::env::var(API_KEY_ENV).ok()))
    }

    /// Replaces the API key with `key` when it is present and non-blank.
    #[must_use]
    pub fn with_api_key_override(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    /// Returns the API key, or [`GenerationError::MissingApiKey`].
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)
    }

    /// Full URL of the completion operation for the configured model.
    #[must_use]
    pub fn request_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        let max_attempts = self.max_attempts.clamp(1, MAX_ATTEMPTS);
        if max_attempts != self.max_attempts {
            warn!(
                configured = self.max_attempts,
                used = max_attempts,
                "max_attempts out of range"
            );
        }
        RetryPolicy::new(max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AiConfig::from_toml_str("").unwrap();
        assert_eq!(config, AiConfig::default());
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_policy().base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_document() {
        let config = AiConfig::from_toml_str(
            "endpoint = \"http://localhost:8080/v1/\"\nmodel = \"test-model\"\nbase_delay_ms = 0\n",
        )
        .unwrap();
        assert_eq!(
            config.request_url(),
            "http://localhost:8080/v1/models/test-model:generateContent"
        );
        assert_eq!(config.retry_policy().base_delay, Duration::ZERO);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_max_attempts_is_capped() {
        let config = AiConfig::from_toml_str("max_attempts = 9").unwrap();
        assert_eq!(config.retry_policy().max_attempts, 5);

        let config = AiConfig::from_toml_str("max_attempts = 0").unwrap();
        assert_eq!(config.retry_policy().max_attempts, 1);

        let config = AiConfig::from_toml_str("max_attempts = 2").unwrap();
        assert_eq!(config.retry_policy().max_attempts, 2);
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            AiConfig::from_toml_str("max_attempts = \"five\""),
            Err(GenerationError::Config(_))
        ));
    }

    #[test]
    fn test_api_key_override() {
        let config = AiConfig::from_toml_str("api_key = \"from-file\"").unwrap();
        assert_eq!(config.api_key().unwrap(), "from-file");

        let config = config.with_api_key_override(Some("from-env".to_string()));
        assert_eq!(config.api_key().unwrap(), "from-env");

        let config = config.with_api_key_override(Some("  ".to_string()));
        assert_eq!(config.api_key().unwrap(), "from-env");
    }

    #[test]
    fn test_missing_api_key() {
        let config = AiConfig {
            api_key: Some(String::new()),
            ..AiConfig::default()
        };
        assert!(matches!(config.api_key(), Err(GenerationError::MissingApiKey)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = AiConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(GenerationError::Config(_))));
    }
}
