//! Filesystem artifact store - Implements ArtifactStorePort with tokio::fs
//!
//! Files land flat in one output directory:
//! `progressive_{session}.{ext}` (overwritten per snapshot),
//! `podcast_{session}_{unix}.{ext}` and `script_{session}_{unix}.txt`, where
//! `ext` follows the configured audio delivery format.

use std::path::{Path, PathBuf};

use ai_speech::AudioFormat;
use application::{
    error::ApplicationError,
    ports::{ArtifactRef, ArtifactStorePort},
};
use async_trait::async_trait;
use chrono::Utc;
use domain::SessionId;
use tracing::{debug, info, instrument};

use crate::config::StorageConfig;

/// Stores artifacts under a local directory
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    output_dir: PathBuf,
    download_prefix: String,
    audio_extension: String,
}

impl FileArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, download_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            download_prefix: download_prefix.into().trim_end_matches('/').to_string(),
            audio_extension: "mp3".to_string(),
        }
    }

    /// Store whose audio names carry the extension of `format`
    pub fn from_config(config: &StorageConfig, format: AudioFormat) -> Self {
        Self::new(&config.output_dir, &config.download_prefix)
            .with_audio_extension(format.extension())
    }

    /// Extension of audio artifacts; matches the codec's delivery format
    #[must_use]
    pub fn with_audio_extension(mut self, extension: impl Into<String>) -> Self {
        self.audio_extension = extension.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn audio_url(&self, name: &str) -> String {
        format!("{}/audio/{name}", self.download_prefix)
    }

    fn script_url(&self, name: &str) -> String {
        format!("{}/script/{name}", self.download_prefix)
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ApplicationError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| storage_error(&self.output_dir, &e))?;
        let path = self.output_dir.join(name);
        // Snapshots may be read while they are replaced
        let staging = self.output_dir.join(format!(".{name}.partial"));
        tokio::fs::write(&staging, bytes)
            .await
            .map_err(|e| storage_error(&staging, &e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| storage_error(&path, &e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
        Ok(path)
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> ApplicationError {
    ApplicationError::Storage(format!("{}: {err}", path.display()))
}

#[async_trait]
impl ArtifactStorePort for FileArtifactStore {
    #[instrument(skip(self, audio), fields(session_id = %session, bytes = audio.len()))]
    async fn write_snapshot(
        &self,
        session: &SessionId,
        audio: Vec<u8>,
    ) -> Result<ArtifactRef, ApplicationError> {
        let name = format!("progressive_{session}.{}", self.audio_extension);
        let path = self.write(&name, &audio).await?;
        Ok(ArtifactRef {
            path,
            url: format!("{}?t={}", self.audio_url(&name), Utc::now().timestamp()),
        })
    }

    #[instrument(skip(self, audio), fields(session_id = %session, bytes = audio.len()))]
    async fn write_final_audio(
        &self,
        session: &SessionId,
        audio: Vec<u8>,
    ) -> Result<ArtifactRef, ApplicationError> {
        let name = format!(
            "podcast_{session}_{}.{}",
            Utc::now().timestamp(),
            self.audio_extension
        );
        let path = self.write(&name, &audio).await?;
        info!(path = %path.display(), "Final audio written");
        Ok(ArtifactRef {
            url: self.audio_url(&name),
            path,
        })
    }

    #[instrument(skip(self, transcript), fields(session_id = %session))]
    async fn write_transcript(
        &self,
        session: &SessionId,
        transcript: &str,
    ) -> Result<ArtifactRef, ApplicationError> {
        let name = format!("script_{session}_{}.txt", Utc::now().timestamp());
        let path = self.write(&name, transcript.as_bytes()).await?;
        info!(path = %path.display(), "Transcript written");
        Ok(ArtifactRef {
            url: self.script_url(&name),
            path,
        })
    }
}
