//! Progressive audio assembler
//!
//! Owns the single growing episode clip. The intro (music, welcome line,
//! faded music), every synthesized batch and the outro are appended in
//! order, each at the same target loudness, and the clip is exported as a
//! snapshot after every append. Only the pipeline controller drives it.

use std::{fmt, sync::Arc};

use domain::{AudioClip, SessionId};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::{MusicConfig, PipelineConfig},
    error::ApplicationError,
    ports::{ArtifactRef, ArtifactStorePort, AudioCodecPort},
};

/// Peak headroom used when normalizing speech before the loudness match
pub const NORMALIZE_HEADROOM_DB: f64 = 0.1;

/// The growing episode
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressiveAudioState {
    clip: AudioClip,
    version: u32,
}

impl ProgressiveAudioState {
    fn new(sample_rate: u32) -> Self {
        Self {
            clip: AudioClip::empty(sample_rate),
            version: 0,
        }
    }

    pub const fn clip(&self) -> &AudioClip {
        &self.clip
    }

    pub fn duration_ms(&self) -> u64 {
        self.clip.duration_ms()
    }

    /// Number of snapshots exported so far
    pub const fn version(&self) -> u32 {
        self.version
    }
}

/// A freshly exported snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    pub audio_ref: String,
    pub duration_ms: u64,
    pub version: u32,
}

/// Music beds, already at the target loudness
#[derive(Debug, Clone, PartialEq)]
struct MusicBeds {
    lead: AudioClip,
    faded_tail: AudioClip,
}

/// Gates how often progress notifications go out
///
/// After sentence 1 every sentence is announced, then every 2nd sentence up
/// to sentence 3, every 3rd up to sentence 8 and every 4th after that.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmissionThrottle {
    pending: u32,
}

impl EmissionThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sentences per notification at `sequence`
    pub const fn interval_for(sequence: u32) -> u32 {
        match sequence {
            0 | 1 => 1,
            2 | 3 => 2,
            4..=8 => 3,
            _ => 4,
        }
    }

    /// Count a synthesized sentence; true when a notification is due
    pub fn record(&mut self, sequence: u32) -> bool {
        self.pending += 1;
        if self.pending >= Self::interval_for(sequence) {
            self.pending = 0;
            true
        } else {
            false
        }
    }
}

/// Progressive audio assembler
pub struct ProgressiveAssembler {
    codec: Arc<dyn AudioCodecPort>,
    store: Arc<dyn ArtifactStorePort>,
    session: SessionId,
    target_dbfs: f64,
    fade_out_ms: u64,
    state: ProgressiveAudioState,
    beds: Option<MusicBeds>,
}

impl fmt::Debug for ProgressiveAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressiveAssembler")
            .field("session", &self.session)
            .field("target_dbfs", &self.target_dbfs)
            .field("duration_ms", &self.state.duration_ms())
            .field("version", &self.state.version)
            .field("has_music", &self.beds.is_some())
            .finish_non_exhaustive()
    }
}

impl ProgressiveAssembler {
    pub fn new(
        codec: Arc<dyn AudioCodecPort>,
        store: Arc<dyn ArtifactStorePort>,
        session: SessionId,
        config: &PipelineConfig,
    ) -> Self {
        let sample_rate = codec.sample_rate();
        Self {
            codec,
            store,
            session,
            target_dbfs: config.target_dbfs,
            fade_out_ms: config.fade_out_ms,
            state: ProgressiveAudioState::new(sample_rate),
            beds: None,
        }
    }

    pub const fn state(&self) -> &ProgressiveAudioState {
        &self.state
    }

    pub const fn has_music(&self) -> bool {
        self.beds.is_some()
    }

    /// Load both music beds and level them
    ///
    /// On error the assembler keeps working without music.
    #[instrument(skip_all)]
    pub async fn load_music(&mut self, music: &MusicConfig) -> Result<(), ApplicationError> {
        let lead = self.codec.load(&music.intro_bed).await?;
        let tail = self.codec.load(&music.outro_bed).await?;
        debug!(
            lead_ms = lead.duration_ms(),
            tail_ms = tail.duration_ms(),
            "Music beds loaded"
        );
        self.beds = Some(MusicBeds {
            lead: lead.match_loudness(self.target_dbfs),
            faded_tail: tail
                .match_loudness(self.target_dbfs)
                .fade_out(self.fade_out_ms),
        });
        Ok(())
    }

    fn level_speech(&self, clip: &AudioClip) -> AudioClip {
        clip.normalize(NORMALIZE_HEADROOM_DB)
            .match_loudness(self.target_dbfs)
    }

    /// Music bed, welcome line, faded music bed
    #[instrument(skip_all, fields(welcome_bytes = welcome.map_or(0, <[u8]>::len)))]
    pub async fn build_intro(&mut self, welcome: Option<&[u8]>) -> Result<SnapshotRef, ApplicationError> {
        let welcome = match welcome {
            Some(bytes) if !bytes.is_empty() => Some(self.level_speech(&self.codec.decode(bytes).await?)),
            _ => None,
        };

        let mut intro = AudioClip::empty(self.codec.sample_rate());
        if let Some(beds) = &self.beds {
            intro.append(&beds.lead)?;
        }
        if let Some(welcome) = &welcome {
            intro.append(welcome)?;
        }
        if let Some(beds) = &self.beds {
            intro.append(&beds.faded_tail)?;
        }

        self.state.clip.append(&intro)?;
        info!(duration_ms = self.state.duration_ms(), "Intro assembled");
        self.export_snapshot().await
    }

    /// Append one batch of synthesized sentences
    ///
    /// Sentences that fail to decode are skipped. Returns `None` when
    /// nothing in the batch was playable.
    #[instrument(skip_all, fields(sentences = sentences.len()))]
    pub async fn append_batch(
        &mut self,
        sentences: &[Vec<u8>],
    ) -> Result<Option<SnapshotRef>, ApplicationError> {
        let mut batch = AudioClip::empty(self.codec.sample_rate());
        for audio in sentences.iter().filter(|a| !a.is_empty()) {
            match self.codec.decode(audio).await {
                Ok(clip) => batch.append(&clip)?,
                Err(e) => warn!(error = %e, "Skipping undecodable sentence audio"),
            }
        }
        if batch.is_empty() {
            return Ok(None);
        }

        let leveled = self.level_speech(&batch);
        self.state.clip.append(&leveled)?;
        debug!(
            batch_ms = leveled.duration_ms(),
            total_ms = self.state.duration_ms(),
            "Batch appended"
        );
        self.export_snapshot().await.map(Some)
    }

    /// Music bed followed by the faded bed; `None` without music
    #[instrument(skip_all)]
    pub async fn append_outro(&mut self) -> Result<Option<SnapshotRef>, ApplicationError> {
        let Some(beds) = &self.beds else {
            return Ok(None);
        };
        let outro = AudioClip::concat(self.codec.sample_rate(), [&beds.lead, &beds.faded_tail])?;
        self.state.clip.append(&outro)?;
        info!(duration_ms = self.state.duration_ms(), "Outro appended");
        self.export_snapshot().await.map(Some)
    }

    /// Overwrite the session snapshot with the current state
    pub async fn export_snapshot(&mut self) -> Result<SnapshotRef, ApplicationError> {
        let bytes = self.codec.encode(&self.state.clip).await?;
        let artifact = self.store.write_snapshot(&self.session, bytes).await?;
        self.state.version += 1;
        Ok(SnapshotRef {
            audio_ref: artifact.url,
            duration_ms: self.state.duration_ms(),
            version: self.state.version,
        })
    }

    /// Write the complete episode as the final artifact
    #[instrument(skip_all, fields(duration_ms = self.state.duration_ms()))]
    pub async fn finalize(&self) -> Result<ArtifactRef, ApplicationError> {
        let bytes = self.codec.encode(&self.state.clip).await?;
        self.store.write_final_audio(&self.session, bytes).await
    }
}
