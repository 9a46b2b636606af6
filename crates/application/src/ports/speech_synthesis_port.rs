//! Speech synthesis port - Interface for streaming text-to-speech

use std::{fmt, pin::Pin};

use async_trait::async_trait;
use futures::Stream;

use crate::error::ApplicationError;

/// One event of a synthesis stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Encoded audio bytes
    Audio(Vec<u8>),
    /// The collaborator signalled completion
    Complete,
}

/// Synthesis events; collaborator-reported errors arrive as `Err` items
pub type SpeechEventStream =
    Pin<Box<dyn Stream<Item = Result<SpeechEvent, ApplicationError>> + Send>>;

/// An open synthesis stream
pub struct SynthesisStream {
    pub trace_id: Option<String>,
    pub events: SpeechEventStream,
}

impl fmt::Debug for SynthesisStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisStream")
            .field("trace_id", &self.trace_id)
            .finish_non_exhaustive()
    }
}

/// Port for speech synthesis
#[async_trait]
pub trait SpeechSynthesisPort: Send + Sync {
    /// Start synthesizing `text` with `voice_id`
    async fn synthesize_stream(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<SynthesisStream, ApplicationError>;
}
