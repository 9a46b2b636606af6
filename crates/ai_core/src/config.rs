//! Configuration for the MiniMax text and image client

use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration for the inference client
#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Bearer token for the text and image endpoints
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the MiniMax API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chat model used for scripts and prompts
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Image model used for cover art
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Timeout for streaming script generation in milliseconds
    #[serde(default = "default_script_timeout_ms")]
    pub script_timeout_ms: u64,

    /// Timeout for short non-streaming completions in milliseconds
    #[serde(default = "default_prompt_timeout_ms")]
    pub prompt_timeout_ms: u64,

    /// Timeout for image generation in milliseconds
    #[serde(default = "default_image_timeout_ms")]
    pub image_timeout_ms: u64,
}

fn default_base_url() -> String {
    "https://api.minimaxi.com".to_string()
}

fn default_text_model() -> String {
    "MiniMax-M1".to_string()
}

fn default_image_model() -> String {
    "image-01-live".to_string()
}

const fn default_script_timeout_ms() -> u64 {
    120_000
}

const fn default_prompt_timeout_ms() -> u64 {
    30_000
}

const fn default_image_timeout_ms() -> u64 {
    60_000
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            script_timeout_ms: default_script_timeout_ms(),
            prompt_timeout_ms: default_prompt_timeout_ms(),
            image_timeout_ms: default_image_timeout_ms(),
        }
    }
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("image_model", &self.image_model)
            .finish_non_exhaustive()
    }
}

impl InferenceConfig {
    /// Whether an API key is present
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("minimax.base_url must be an http(s) URL: {}", self.base_url));
        }
        if self.text_model.trim().is_empty() {
            return Err("minimax.text_model must not be empty".to_string());
        }
        if self.script_timeout_ms == 0 || self.prompt_timeout_ms == 0 || self.image_timeout_ms == 0
        {
            return Err("minimax timeouts must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = InferenceConfig::default();
        assert_eq!(config.base_url, "https://api.minimaxi.com");
        assert_eq!(config.text_model, "MiniMax-M1");
        assert_eq!(config.image_model, "image-01-live");
        assert_eq!(config.script_timeout_ms, 120_000);
        assert_eq!(config.prompt_timeout_ms, 30_000);
        assert_eq!(config.image_timeout_ms, 60_000);
        assert!(!config.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_deserialization_fills_defaults() {
        let json = r#"{"api_key":"k","base_url":"http://custom:8080"}"#;
        let config: InferenceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_url, "http://custom:8080");
        assert_eq!(config.text_model, "MiniMax-M1");
        assert!(config.has_credentials());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let config = InferenceConfig {
            base_url: "ftp://x".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = InferenceConfig {
            image_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_hides_api_key() {
        let config = InferenceConfig {
            api_key: "secret-key".to_string(),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("***"));
    }
}
