//! Infrastructure layer - Adapters for external systems
//!
//! Implements the application ports on top of the MiniMax clients, FFmpeg
//! and the local filesystem. Also owns configuration loading and logging
//! setup.

pub mod adapters;
pub mod config;
pub mod telemetry;

pub use adapters::*;
pub use config::{AppConfig, StorageConfig};
pub use telemetry::{LogFormat, TelemetryConfig, TelemetryError, init_telemetry};
