//! Domain entities - Objects with identity and lifecycle

mod audio_clip;
mod cover_result;
mod pipeline_stage;
mod podcast_event;
mod sentence;
mod synthesis_outcome;
mod trace_registry;
mod voice_binding;

pub use audio_clip::AudioClip;
pub use cover_result::CoverResult;
pub use pipeline_stage::PipelineStage;
pub use podcast_event::{BgmCue, PodcastEvent, ProgressStep};
pub use sentence::{Batch, BatchBuilder, Sentence};
pub use synthesis_outcome::SynthesisOutcome;
pub use trace_registry::TraceRegistry;
pub use voice_binding::{DEFAULT_VOICES, DefaultVoice, Gender, VoiceBinding, VoiceCandidate};
