//! Result of synthesizing one sentence

use crate::entities::TraceRegistry;

/// Audio for one sentence, or a record that every candidate failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutcome {
    audio: Vec<u8>,
    used_fallback: bool,
    trace_ids: TraceRegistry,
    failed: bool,
}

impl SynthesisOutcome {
    pub fn succeeded(audio: Vec<u8>, used_fallback: bool, trace_ids: TraceRegistry) -> Self {
        Self {
            audio,
            used_fallback,
            trace_ids,
            failed: false,
        }
    }

    /// Every candidate exhausted its retries; carries no audio
    pub fn failed(trace_ids: TraceRegistry) -> Self {
        Self {
            audio: Vec::new(),
            used_fallback: false,
            trace_ids,
            failed: true,
        }
    }

    pub fn audio(&self) -> &[u8] {
        &self.audio
    }

    pub fn into_audio(self) -> Vec<u8> {
        self.audio
    }

    pub const fn used_fallback(&self) -> bool {
        self.used_fallback
    }

    pub const fn trace_ids(&self) -> &TraceRegistry {
        &self.trace_ids
    }

    pub const fn is_failed(&self) -> bool {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_has_no_audio() {
        let outcome = SynthesisOutcome::failed(TraceRegistry::new());
        assert!(outcome.is_failed());
        assert!(outcome.audio().is_empty());
        assert!(!outcome.used_fallback());
    }

    #[test]
    fn succeeded_keeps_audio() {
        let mut traces = TraceRegistry::new();
        traces.record("tts_Speaker1_1_fallback", "t");
        let outcome = SynthesisOutcome::succeeded(vec![1, 2, 3], true, traces);
        assert!(!outcome.is_failed());
        assert!(outcome.used_fallback());
        assert_eq!(outcome.trace_ids().len(), 1);
        assert_eq!(outcome.into_audio(), vec![1, 2, 3]);
    }
}
