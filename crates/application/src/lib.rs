//! Application layer - DuoCast use cases and orchestration
//!
//! Contains the generation pipeline, its concurrent stages and the port
//! definitions the infrastructure adapters implement.

pub mod cancellation;
pub mod config;
pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use cancellation::{CancelToken, CancellationSignal};
pub use config::{CoverConfig, CoverSource, MusicConfig, PipelineConfig};
pub use error::{ApplicationError, PipelineError};
pub use ports::*;
pub use services::*;
