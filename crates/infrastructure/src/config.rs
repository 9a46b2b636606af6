//! Application configuration
//!
//! Layered as built-in defaults, then an optional `duocast.toml`, then
//! environment variables such as `DUOCAST_MINIMAX__API_KEY`.

use std::path::{Path, PathBuf};

use ai_core::InferenceConfig;
use ai_speech::SpeechConfig;
use application::config::{CoverConfig, MusicConfig, PipelineConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::telemetry::TelemetryConfig;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "duocast.toml";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "DUOCAST";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// MiniMax text and image endpoints
    #[serde(default)]
    pub minimax: InferenceConfig,

    /// MiniMax speech endpoints and audio output settings
    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub music: MusicConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cover: CoverConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Where artifacts are written and how they are addressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving snapshots, final audio and transcripts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Prefix of artifact references, e.g. `/download/audio/...`
    #[serde(default = "default_download_prefix")]
    pub download_prefix: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_download_prefix() -> String {
    "/download".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            download_prefix: default_download_prefix(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.output_dir.as_os_str().is_empty() {
            return Err("storage.output_dir must not be empty".to_string());
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load from `duocast.toml` (if present) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load with an explicit configuration file, which must exist
    pub fn load_from(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::build(file, env_source())
    }

    fn build(
        file: Option<&Path>,
        env: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let config = config::Config::builder()
            .add_source(file_source)
            .add_source(env)
            .build()?;

        let mut app: Self = config.try_deserialize()?;
        app.share_api_key();
        debug!(
            text_key = app.minimax.has_credentials(),
            speech_key = app.speech.has_credentials(),
            "Configuration loaded"
        );
        Ok(app)
    }

    /// One MiniMax key serves both clients unless the speech key is set
    fn share_api_key(&mut self) {
        if !self.speech.has_credentials() && self.minimax.has_credentials() {
            self.speech.api_key.clone_from(&self.minimax.api_key);
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.minimax.validate()?;
        self.speech.validate()?;
        self.pipeline.validate()?;
        self.cover.validate()?;
        self.storage.validate()?;
        Ok(())
    }

    /// Whether the remote clients can authenticate
    pub fn has_credentials(&self) -> bool {
        self.minimax.has_credentials() && self.speech.has_credentials()
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
