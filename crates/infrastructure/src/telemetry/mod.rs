//! Logging setup
//!
//! Installs a `tracing` subscriber with an environment filter and a text or
//! JSON formatter. Logs go to stderr; stdout carries the event stream.

mod subscriber;

pub use subscriber::{LogFormat, TelemetryConfig, TelemetryError, init_telemetry};
