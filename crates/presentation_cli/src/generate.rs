//! The `generate` subcommand
//!
//! Builds the adapters from configuration, resolves both voices, then runs
//! the pipeline and prints every event as one JSON line on stdout.

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use application::{
    CancellationSignal, CoverTimeouts, PendingVoice, PipelinePorts, PipelineSettings,
    PodcastPipeline, PodcastRequest, VoiceBindingResolver, VoiceResolution,
};
use domain::{PodcastEvent, SessionId};
use infrastructure::{
    AppConfig, AudioCodecAdapter, FileArtifactStore, ImageGenerationAdapter, SpeechAdapter,
    TextGenerationAdapter,
};
use tracing::{info, warn};

use crate::voice_arg::VoiceArg;

/// Options of one `generate` invocation
#[derive(Debug)]
pub struct GenerateOptions {
    pub content_file: std::path::PathBuf,
    pub speaker1: VoiceArg,
    pub speaker2: VoiceArg,
    pub session_id: Option<String>,
    pub accept_default_voices: bool,
}

/// Concrete adapters shared by resolver and pipeline
pub struct Services {
    pub speech: Arc<SpeechAdapter>,
    pub codec: Arc<AudioCodecAdapter>,
    pub ports: PipelinePorts,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

impl Services {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let speech = Arc::new(SpeechAdapter::new(config.speech.clone())?);
        let codec = Arc::new(AudioCodecAdapter::from_config(&config.speech));
        let ports = PipelinePorts {
            text: Arc::new(TextGenerationAdapter::new(config.minimax.clone())?),
            speech: Arc::clone(&speech) as _,
            images: Arc::new(ImageGenerationAdapter::new(config.minimax.clone())?),
            codec: Arc::clone(&codec) as _,
            store: Arc::new(FileArtifactStore::from_config(
                &config.storage,
                config.speech.format,
            )),
        };
        Ok(Self {
            speech,
            codec,
            ports,
        })
    }
}

/// Pipeline settings taken from the loaded configuration
pub fn settings(config: &AppConfig) -> PipelineSettings {
    PipelineSettings {
        pipeline: config.pipeline.clone(),
        music: config.music.clone(),
        cover: config.cover.clone(),
        cover_timeouts: CoverTimeouts {
            prompt: Duration::from_millis(config.minimax.prompt_timeout_ms),
            image: Duration::from_millis(config.minimax.image_timeout_ms),
        },
    }
}

/// One line per rejected voice id
pub fn pending_summary(pending: &[PendingVoice]) -> String {
    pending
        .iter()
        .map(|p| {
            format!(
                "{}: voice id '{}' rejected ({}); default '{}' suggested",
                p.speaker, p.requested, p.reason, p.suggested.key
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize an event for the stdout stream
pub fn event_line(event: &PodcastEvent) -> anyhow::Result<String> {
    Ok(serde_json::to_string(event)?)
}

async fn read_content(path: &Path) -> anyhow::Result<String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read content file {}", path.display()))?;
    if content.trim().is_empty() {
        bail!("content file {} is empty", path.display());
    }
    Ok(content)
}

#[allow(clippy::print_stdout)]
pub async fn run(config: &AppConfig, options: GenerateOptions) -> anyhow::Result<()> {
    if !config.has_credentials() {
        bail!("no MiniMax API key configured (set DUOCAST_MINIMAX__API_KEY)");
    }
    let content = read_content(&options.content_file).await?;
    let session = match options.session_id.as_deref() {
        Some(raw) => SessionId::parse(raw)?,
        None => SessionId::new(),
    };

    let services = Services::from_config(config)?;
    if !services.codec.is_available().await {
        warn!("FFmpeg not found, audio decoding will fail");
    }

    let signal = Arc::new(CancellationSignal::new());
    let ctrl_c_signal = Arc::clone(&signal);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            ctrl_c_signal.cancel();
        }
    });

    let resolver = VoiceBindingResolver::new(
        Arc::clone(&services.speech) as _,
        Arc::clone(&services.codec) as _,
    );
    let resolution = resolver
        .resolve(
            options.speaker1.into_config().await?,
            options.speaker2.into_config().await?,
            &signal.token(),
        )
        .await?;
    let voices = match resolution {
        VoiceResolution::Resolved(voices) => voices,
        VoiceResolution::NeedsConfirmation { ref pending, .. } if !options.accept_default_voices => {
            bail!(
                "{}\nrerun with --accept-default-voices to use the suggested defaults",
                pending_summary(pending)
            );
        },
        confirmed @ VoiceResolution::NeedsConfirmation { .. } => {
            warn!(
                pending = confirmed.pending().len(),
                "Using default voices for rejected ids"
            );
            confirmed.accept_defaults()
        },
    };

    info!(session_id = %session, "Starting podcast generation");
    let pipeline = Arc::new(PodcastPipeline::new(services.ports, settings(config)));
    let (mut events, handle) = pipeline.start(
        PodcastRequest {
            session,
            content,
            voices,
        },
        signal.token(),
    );
    while let Some(event) = events.recv().await {
        println!("{}", event_line(&event)?);
    }

    let outcome = handle.await.context("pipeline task panicked")??;
    info!(
        final_audio = %outcome.final_audio.path.display(),
        sentences = outcome.total_sentences,
        "Podcast complete"
    );
    Ok(())
}
