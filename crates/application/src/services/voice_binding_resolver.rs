//! Voice binding resolver
//!
//! Turns each speaker's voice choice into a [`VoiceBinding`]. Default voice
//! names map straight to the static table, explicit voice ids are
//! format-checked and looked up in the account's catalog, and audio samples
//! are cloned into new voices. Ids that fail the checks are never replaced
//! silently: they come back as [`PendingVoice`]s for the caller to confirm.

use std::sync::Arc;

use domain::{DefaultVoice, Speaker, TraceRegistry, VoiceBinding, VoiceId};
use tracing::{info, instrument, warn};

use crate::{
    cancellation::CancelToken,
    error::ApplicationError,
    ports::{AudioCodecPort, VoiceCatalogPort, VoiceListing},
};

/// Shortest audio sample accepted for cloning
pub const MIN_CLONE_SAMPLE_MS: u64 = 10_000;

/// Prefix of generated clone voice ids
pub const CLONE_VOICE_PREFIX: &str = "customVoice";

/// How one speaker's voice was chosen
#[derive(Clone, PartialEq, Eq)]
pub enum SpeakerVoiceConfig {
    /// Name from the default voice table
    Default(String),
    /// Existing voice id
    VoiceId(String),
    /// Audio sample to clone
    Clone { sample: Vec<u8>, file_name: String },
}

impl std::fmt::Debug for SpeakerVoiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default(name) => f.debug_tuple("Default").field(name).finish(),
            Self::VoiceId(id) => f.debug_tuple("VoiceId").field(id).finish(),
            Self::Clone { sample, file_name } => f
                .debug_struct("Clone")
                .field("sample_bytes", &sample.len())
                .field("file_name", file_name)
                .finish(),
        }
    }
}

impl SpeakerVoiceConfig {
    /// The speaker's own default voice
    pub fn default_for(speaker: Speaker) -> Self {
        Self::Default(DefaultVoice::for_speaker(speaker).key.to_string())
    }
}

/// A requested voice id that needs the caller's confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVoice {
    pub speaker: Speaker,
    pub requested: String,
    pub reason: String,
    pub suggested: DefaultVoice,
}

impl PendingVoice {
    /// Binding to use once the caller accepts the suggested default
    pub fn accept_default(&self) -> VoiceBinding {
        VoiceBinding::default_voice(self.speaker, self.suggested)
    }
}

/// Bindings for both speakers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVoices {
    pub speaker1: VoiceBinding,
    pub speaker2: VoiceBinding,
    /// Trace ids of clone uploads and clone calls
    pub traces: TraceRegistry,
    /// Non-fatal notes, such as a clone downgraded to a default voice
    pub warnings: Vec<String>,
}

impl ResolvedVoices {
    pub const fn binding(&self, speaker: Speaker) -> &VoiceBinding {
        match speaker {
            Speaker::Speaker1 => &self.speaker1,
            Speaker::Speaker2 => &self.speaker2,
        }
    }
}

/// Result of resolving both speakers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceResolution {
    Resolved(ResolvedVoices),
    /// Some ids were rejected; `resolved` holds the suggested defaults for them
    NeedsConfirmation {
        resolved: ResolvedVoices,
        pending: Vec<PendingVoice>,
    },
}

impl VoiceResolution {
    pub fn pending(&self) -> &[PendingVoice] {
        match self {
            Self::Resolved(_) => &[],
            Self::NeedsConfirmation { pending, .. } => pending,
        }
    }

    /// Accept every suggested default and return the final bindings
    pub fn accept_defaults(self) -> ResolvedVoices {
        match self {
            Self::Resolved(voices) | Self::NeedsConfirmation {
                resolved: voices, ..
            } => voices,
        }
    }
}

enum SpeakerOutcome {
    Bound(VoiceBinding),
    Pending(PendingVoice),
}

/// Voice binding resolver
pub struct VoiceBindingResolver {
    catalog: Arc<dyn VoiceCatalogPort>,
    codec: Arc<dyn AudioCodecPort>,
}

impl std::fmt::Debug for VoiceBindingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceBindingResolver").finish_non_exhaustive()
    }
}

impl VoiceBindingResolver {
    pub fn new(catalog: Arc<dyn VoiceCatalogPort>, codec: Arc<dyn AudioCodecPort>) -> Self {
        Self { catalog, codec }
    }

    /// Resolve both speakers
    ///
    /// Unknown default voice names are an error. Everything else resolves
    /// to a binding, a pending confirmation, or a downgraded clone.
    #[instrument(skip_all)]
    pub async fn resolve(
        &self,
        speaker1: SpeakerVoiceConfig,
        speaker2: SpeakerVoiceConfig,
        cancel: &CancelToken,
    ) -> Result<VoiceResolution, ApplicationError> {
        let needs_listing = [&speaker1, &speaker2]
            .iter()
            .any(|c| matches!(c, SpeakerVoiceConfig::VoiceId(_)));
        let listing = if needs_listing {
            self.available_voices(cancel).await?
        } else {
            None
        };

        let mut traces = TraceRegistry::new();
        let mut warnings = Vec::new();
        let mut pending = Vec::new();
        let mut bindings = Vec::with_capacity(2);

        for (speaker, config) in [(Speaker::Speaker1, speaker1), (Speaker::Speaker2, speaker2)] {
            let outcome = self
                .resolve_speaker(speaker, config, listing.as_ref(), &mut traces, &mut warnings, cancel)
                .await?;
            let binding = match outcome {
                SpeakerOutcome::Bound(binding) => binding,
                SpeakerOutcome::Pending(voice) => {
                    let substitute = voice.accept_default();
                    pending.push(voice);
                    substitute
                },
            };
            bindings.push(binding);
        }

        let mut bindings = bindings.into_iter();
        let (Some(speaker1), Some(speaker2)) = (bindings.next(), bindings.next()) else {
            return Err(ApplicationError::Internal(
                "voice resolution produced fewer than two bindings".to_string(),
            ));
        };
        let resolved = ResolvedVoices {
            speaker1,
            speaker2,
            traces,
            warnings,
        };
        if pending.is_empty() {
            Ok(VoiceResolution::Resolved(resolved))
        } else {
            Ok(VoiceResolution::NeedsConfirmation { resolved, pending })
        }
    }

    async fn available_voices(
        &self,
        cancel: &CancelToken,
    ) -> Result<Option<VoiceListing>, ApplicationError> {
        match cancel.run_until_cancelled(self.catalog.list_voices()).await? {
            Ok(listing) => {
                info!(count = listing.voice_ids.len(), "Fetched available voices");
                Ok(Some(listing))
            },
            Err(e) => {
                warn!(error = %e, "Could not query available voices, checking format only");
                Ok(None)
            },
        }
    }

    async fn resolve_speaker(
        &self,
        speaker: Speaker,
        config: SpeakerVoiceConfig,
        listing: Option<&VoiceListing>,
        traces: &mut TraceRegistry,
        warnings: &mut Vec<String>,
        cancel: &CancelToken,
    ) -> Result<SpeakerOutcome, ApplicationError> {
        match config {
            SpeakerVoiceConfig::Default(name) => {
                let voice = DefaultVoice::lookup(&name)?;
                Ok(SpeakerOutcome::Bound(VoiceBinding::default_voice(speaker, voice)))
            },
            SpeakerVoiceConfig::VoiceId(id) => Ok(Self::check_voice_id(speaker, id, listing)),
            SpeakerVoiceConfig::Clone { sample, file_name } => {
                match self.clone_voice(speaker, sample, file_name, traces, cancel).await {
                    Ok(voice_id) => Ok(SpeakerOutcome::Bound(VoiceBinding::custom(speaker, voice_id))),
                    Err(ApplicationError::Cancelled) => Err(ApplicationError::Cancelled),
                    Err(e) => {
                        let fallback = DefaultVoice::for_speaker(speaker);
                        warn!(%speaker, error = %e, "Voice clone failed, using default voice");
                        warnings.push(format!(
                            "{speaker} voice clone failed ({e}), using the default voice {}",
                            fallback.name
                        ));
                        Ok(SpeakerOutcome::Bound(VoiceBinding::default_voice(speaker, fallback)))
                    },
                }
            },
        }
    }

    fn check_voice_id(speaker: Speaker, id: String, listing: Option<&VoiceListing>) -> SpeakerOutcome {
        let check = VoiceId::check(&id);
        let reason = if !check.is_valid() {
            Some(check.errors.join(", "))
        } else if listing.is_some_and(|l| !l.contains(id.trim())) {
            Some("voice id is not among the available voices".to_string())
        } else {
            None
        };
        match reason {
            Some(reason) => {
                warn!(%speaker, voice_id = %id, %reason, "Voice id needs confirmation");
                SpeakerOutcome::Pending(PendingVoice {
                    speaker,
                    requested: id,
                    reason,
                    suggested: DefaultVoice::for_speaker(speaker),
                })
            },
            None => SpeakerOutcome::Bound(VoiceBinding::custom(speaker, id.trim())),
        }
    }

    #[instrument(skip(self, sample, traces, cancel), fields(sample_bytes = sample.len()))]
    async fn clone_voice(
        &self,
        speaker: Speaker,
        sample: Vec<u8>,
        file_name: String,
        traces: &mut TraceRegistry,
        cancel: &CancelToken,
    ) -> Result<String, ApplicationError> {
        let clip = cancel.run_until_cancelled(self.codec.decode(&sample)).await??;
        let duration_ms = clip.duration_ms();
        if duration_ms < MIN_CLONE_SAMPLE_MS {
            return Err(ApplicationError::Speech(format!(
                "sample is {duration_ms}ms, at least {MIN_CLONE_SAMPLE_MS}ms is required"
            )));
        }

        let voice_id = VoiceId::generate(CLONE_VOICE_PREFIX)?;
        let cloned = cancel
            .run_until_cancelled(self.catalog.clone_voice(sample, file_name, voice_id))
            .await??;

        let prefix = speaker.label().to_lowercase();
        if let Some(id) = cloned.upload_trace_id {
            traces.record(format!("{prefix}_upload"), id);
        }
        if let Some(id) = cloned.clone_trace_id {
            traces.record(format!("{prefix}_clone"), id);
        }
        info!(%speaker, voice_id = %cloned.voice_id, "Voice cloned");
        Ok(cloned.voice_id)
    }
}
