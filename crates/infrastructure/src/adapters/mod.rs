//! Adapters - Implementations of the application ports

mod audio_codec_adapter;
mod file_artifact_store;
mod image_generation_adapter;
mod speech_adapter;
mod text_generation_adapter;

pub use audio_codec_adapter::AudioCodecAdapter;
pub use file_artifact_store::FileArtifactStore;
pub use image_generation_adapter::ImageGenerationAdapter;
pub use speech_adapter::SpeechAdapter;
pub use text_generation_adapter::{TextGenerationAdapter, map_inference_error};
