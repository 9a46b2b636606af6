//! AI Speech - Text-to-speech and voice management
//!
//! Provides traits and implementations for speech synthesis:
//! - `TextToSpeech` - Stream synthesized audio for one utterance
//! - `VoiceCloner` - Create a custom voice from an audio sample
//! - `VoiceCatalog` - List voices available to the account
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the traits (ports)
//! - `providers` module contains the MiniMax implementation (adapter)
//! - `converter` wraps FFmpeg for PCM decode and MP3 encode

pub mod config;
pub mod converter;
pub mod error;
pub mod ports;
pub mod providers;
pub mod types;

pub use config::SpeechConfig;
pub use converter::AudioConverter;
pub use error::SpeechError;
pub use ports::{TextToSpeech, VoiceCatalog, VoiceCloner};
pub use providers::minimax::MiniMaxSpeechProvider;
pub use types::{
    AudioFormat, CloneRequest, CloneResult, SpeechChunk, SpeechStream, VoiceInfo, VoiceKind,
};
