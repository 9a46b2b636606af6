//! Voice catalog port - Interface for listing and cloning voices

use async_trait::async_trait;
use domain::VoiceId;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Voice ids the account can synthesize with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceListing {
    pub voice_ids: Vec<String>,
    pub trace_id: Option<String>,
}

impl VoiceListing {
    pub fn contains(&self, voice_id: &str) -> bool {
        self.voice_ids.iter().any(|id| id == voice_id)
    }
}

/// A freshly cloned voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonedVoice {
    pub voice_id: String,
    pub upload_trace_id: Option<String>,
    pub clone_trace_id: Option<String>,
}

/// Port for the voice catalog
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VoiceCatalogPort: Send + Sync {
    /// All system, cloned and generated voice ids
    async fn list_voices(&self) -> Result<VoiceListing, ApplicationError>;

    /// Clone a voice from an audio sample under `voice_id`
    async fn clone_voice(
        &self,
        sample: Vec<u8>,
        file_name: String,
        voice_id: VoiceId,
    ) -> Result<ClonedVoice, ApplicationError>;
}
