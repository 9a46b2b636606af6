//! Audio codec port - Interface for decoding and encoding audio

use std::path::Path;

use async_trait::async_trait;
use domain::AudioClip;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for audio decode and encode
///
/// All clips produced by one codec share its sample rate.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AudioCodecPort: Send + Sync {
    /// Decode encoded audio bytes into PCM
    async fn decode(&self, bytes: &[u8]) -> Result<AudioClip, ApplicationError>;

    /// Decode an audio file from disk
    async fn load(&self, path: &Path) -> Result<AudioClip, ApplicationError>;

    /// Encode PCM into the delivery format
    async fn encode(&self, clip: &AudioClip) -> Result<Vec<u8>, ApplicationError>;

    /// Sample rate of decoded clips
    fn sample_rate(&self) -> u32;
}
