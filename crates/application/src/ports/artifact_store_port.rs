//! Artifact store port - Interface for persisting audio and transcripts

use std::path::PathBuf;

use async_trait::async_trait;
use domain::SessionId;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Location of a written artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Path on disk
    pub path: PathBuf,
    /// Reference handed to clients
    pub url: String,
}

/// Port for artifact persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArtifactStorePort: Send + Sync {
    /// Overwrite the session's progressive snapshot
    async fn write_snapshot(
        &self,
        session: &SessionId,
        audio: Vec<u8>,
    ) -> Result<ArtifactRef, ApplicationError>;

    /// Write the final merged episode
    async fn write_final_audio(
        &self,
        session: &SessionId,
        audio: Vec<u8>,
    ) -> Result<ArtifactRef, ApplicationError>;

    /// Write the script transcript
    async fn write_transcript(
        &self,
        session: &SessionId,
        transcript: &str,
    ) -> Result<ArtifactRef, ApplicationError>;
}
