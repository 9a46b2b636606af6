//! AI Core - Text and image generation clients
//!
//! Talks to the MiniMax HTTP API: streaming chat completion for script
//! generation, plain completion for short prompts, and image generation for
//! cover art. Also hosts the SSE line decoder shared with the speech client.

pub mod config;
pub mod error;
pub mod minimax;
pub mod ports;
pub mod sse;

pub use config::InferenceConfig;
pub use error::InferenceError;
pub use minimax::{BaseResp, MiniMaxClient, trace_id_from_headers};
pub use ports::{
    ChunkStream, ImageGenerator, ImageRequest, ImageResponse, ImageStyle, InferenceEngine,
    InferenceMessage, InferenceRequest, InferenceResponse, StreamingChunk, StreamingResponse,
};
