//! Audio codec adapter - Implements AudioCodecPort using the FFmpeg converter

use std::path::Path;

use ai_speech::{AudioConverter, AudioFormat, SpeechConfig, SpeechError};
use application::{error::ApplicationError, ports::AudioCodecPort};
use async_trait::async_trait;
use domain::AudioClip;
use tracing::{debug, instrument};

/// Decodes service audio to PCM and encodes assembled clips for delivery
#[derive(Debug, Clone)]
pub struct AudioCodecAdapter {
    converter: AudioConverter,
    sample_rate: u32,
    format: AudioFormat,
    bitrate: u32,
}

fn map_error(err: SpeechError) -> ApplicationError {
    ApplicationError::Audio(err.to_string())
}

impl AudioCodecAdapter {
    pub fn new(converter: AudioConverter, sample_rate: u32, format: AudioFormat, bitrate: u32) -> Self {
        Self {
            converter,
            sample_rate,
            format,
            bitrate,
        }
    }

    /// Working rate and delivery format follow the synthesis output settings
    pub fn from_config(config: &SpeechConfig) -> Self {
        let converter = config
            .ffmpeg_path
            .as_deref()
            .map_or_else(AudioConverter::new, AudioConverter::with_ffmpeg_path);
        Self::new(converter, config.sample_rate, config.format, config.bitrate)
    }

    /// Whether FFmpeg can be started
    pub async fn is_available(&self) -> bool {
        self.converter.is_available().await
    }
}

#[async_trait]
impl AudioCodecPort for AudioCodecAdapter {
    async fn decode(&self, bytes: &[u8]) -> Result<AudioClip, ApplicationError> {
        let samples = self
            .converter
            .decode_to_pcm(bytes, self.sample_rate)
            .await
            .map_err(map_error)?;
        Ok(AudioClip::new(samples, self.sample_rate))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn load(&self, path: &Path) -> Result<AudioClip, ApplicationError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApplicationError::Audio(format!("Failed to read {}: {e}", path.display()))
        })?;
        let clip = self.decode(&bytes).await?;
        debug!(duration_ms = clip.duration_ms(), "Audio file loaded");
        Ok(clip)
    }

    async fn encode(&self, clip: &AudioClip) -> Result<Vec<u8>, ApplicationError> {
        self.converter
            .encode_pcm(clip.samples(), clip.sample_rate(), self.format, self.bitrate)
            .await
            .map_err(map_error)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
