//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod artifact_store_port;
mod audio_codec_port;
mod image_generation_port;
mod speech_synthesis_port;
mod text_generation_port;
mod voice_catalog_port;

#[cfg(test)]
pub use artifact_store_port::MockArtifactStorePort;
pub use artifact_store_port::{ArtifactRef, ArtifactStorePort};
#[cfg(test)]
pub use audio_codec_port::MockAudioCodecPort;
pub use audio_codec_port::AudioCodecPort;
#[cfg(test)]
pub use image_generation_port::MockImageGenerationPort;
pub use image_generation_port::{GeneratedImage, ImageGenerationPort, ImageRequest};
pub use speech_synthesis_port::{SpeechEvent, SpeechEventStream, SpeechSynthesisPort, SynthesisStream};
pub use text_generation_port::{DeltaStream, ScriptStream, TextGenerationPort, TextReply};
#[cfg(test)]
pub use voice_catalog_port::MockVoiceCatalogPort;
pub use voice_catalog_port::{ClonedVoice, VoiceCatalogPort, VoiceListing};
