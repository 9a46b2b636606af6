//! Application services - the podcast generation use case and its stages

pub mod cover_art;
pub mod podcast_pipeline;
pub mod progressive_assembler;
pub mod prompts;
pub mod script_producer;
pub mod synthesis_retry;
pub mod voice_binding_resolver;

pub use cover_art::{CoverArtTask, CoverMaterial, CoverTimeouts};
pub use podcast_pipeline::{
    PipelinePorts, PipelineSettings, PodcastOutcome, PodcastPipeline, PodcastRequest,
};
pub use progressive_assembler::{
    EmissionThrottle, ProgressiveAssembler, ProgressiveAudioState, SnapshotRef,
};
pub use script_producer::{LineBuffer, ProducerMessage, ProducerSummary, ScriptProducer};
pub use synthesis_retry::{
    Attempt, AttemptResult, RateLimitTracker, RetryPolicy, RetryStep, SentenceSynthesizer,
};
pub use voice_binding_resolver::{
    PendingVoice, ResolvedVoices, SpeakerVoiceConfig, VoiceBindingResolver, VoiceResolution,
};
