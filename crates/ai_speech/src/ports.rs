//! Port definitions for speech processing
//!
//! Defines the traits (ports) that speech adapters must implement.

use async_trait::async_trait;

use crate::{
    error::SpeechError,
    types::{CloneRequest, CloneResult, SpeechStream, VoiceInfo},
};

/// Port for Text-to-Speech (TTS) implementations
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Start streaming synthesis of `text` with `voice_id`
    ///
    /// Transport and HTTP status failures are returned directly. Failures
    /// reported inside the stream arrive as `Err` items.
    async fn synthesize_stream(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<SpeechStream, SpeechError>;
}

/// Port for voice cloning
#[async_trait]
pub trait VoiceCloner: Send + Sync {
    async fn clone_voice(&self, request: CloneRequest) -> Result<CloneResult, SpeechError>;
}

/// Port for listing voices available to the account
#[async_trait]
pub trait VoiceCatalog: Send + Sync {
    /// List voices with their trace id
    async fn list_voices(&self) -> Result<(Vec<VoiceInfo>, Option<String>), SpeechError>;
}
