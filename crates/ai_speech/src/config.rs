//! Configuration for speech processing

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::AudioFormat;

/// Configuration for the speech service and local conversion
#[derive(Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Bearer token for the speech endpoints
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the MiniMax API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Text-to-speech model
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// Model used when cloning a voice
    #[serde(default = "default_clone_model")]
    pub clone_model: String,

    /// Output sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output bitrate in bits per second
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,

    /// Output audio format
    #[serde(default)]
    pub format: AudioFormat,

    /// Output channel count
    #[serde(default = "default_channels")]
    pub channels: u8,

    /// Speaking speed
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// Volume multiplier
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Pitch offset in semitones
    #[serde(default)]
    pub pitch: i32,

    /// Timeout for one synthesis call in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Timeout for file upload and clone calls in milliseconds
    #[serde(default = "default_clone_timeout_ms")]
    pub clone_timeout_ms: u64,

    /// Preview text read back by a freshly cloned voice
    #[serde(default = "default_clone_sample_text")]
    pub clone_sample_text: String,

    /// FFmpeg binary path (defaults to "ffmpeg" in PATH)
    #[serde(default)]
    pub ffmpeg_path: Option<String>,
}

fn default_base_url() -> String {
    "https://api.minimaxi.com".to_string()
}

fn default_tts_model() -> String {
    "speech-2.5-hd-preview".to_string()
}

fn default_clone_model() -> String {
    "speech-02-turbo".to_string()
}

const fn default_sample_rate() -> u32 {
    32_000
}

const fn default_bitrate() -> u32 {
    128_000
}

const fn default_channels() -> u8 {
    1
}

const fn default_speed() -> f32 {
    1.0
}

const fn default_volume() -> f32 {
    1.0
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_clone_timeout_ms() -> u64 {
    60_000
}

fn default_clone_sample_text() -> String {
    "大家好，欢迎收听今天的播客节目。".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            tts_model: default_tts_model(),
            clone_model: default_clone_model(),
            sample_rate: default_sample_rate(),
            bitrate: default_bitrate(),
            format: AudioFormat::default(),
            channels: default_channels(),
            speed: default_speed(),
            volume: default_volume(),
            pitch: 0,
            timeout_ms: default_timeout_ms(),
            clone_timeout_ms: default_clone_timeout_ms(),
            clone_sample_text: default_clone_sample_text(),
            ffmpeg_path: None,
        }
    }
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("base_url", &self.base_url)
            .field("tts_model", &self.tts_model)
            .field("sample_rate", &self.sample_rate)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl SpeechConfig {
    /// Whether an API key is present
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("speech.base_url must be an http(s) URL: {}", self.base_url));
        }
        if self.sample_rate == 0 {
            return Err("speech.sample_rate must be greater than zero".to_string());
        }
        if self.channels != 1 {
            return Err("speech.channels must be 1 (mono)".to_string());
        }
        if !(0.5..=2.0).contains(&self.speed) {
            return Err("speech.speed must be between 0.5 and 2.0".to_string());
        }
        if self.timeout_ms == 0 || self.clone_timeout_ms == 0 {
            return Err("speech timeouts must be greater than zero".to_string());
        }
        Ok(())
    }
}
