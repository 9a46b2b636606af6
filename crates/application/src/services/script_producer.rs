//! Script stream producer
//!
//! Turns the incremental text stream of the script model into validated,
//! batched sentences. Runs as its own task and talks to the pipeline only
//! through a bounded queue of [`ProducerMessage`]s, always finishing with
//! [`ProducerMessage::Done`] unless it was cancelled.

use std::sync::Arc;

use domain::{Batch, BatchBuilder, Sentence, Speaker};
use futures::StreamExt;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::{
    cancellation::CancelToken, config::PipelineConfig, error::ApplicationError,
    ports::TextGenerationPort,
};

/// Message on the batch queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerMessage {
    /// The script stream is open
    Started { trace_id: Option<String> },
    /// A full batch, or the final partial one
    Batch(Batch),
    /// No more batches will follow
    Done(ProducerSummary),
}

/// Totals reported with the completion marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerSummary {
    pub trace_id: Option<String>,
    pub total_sentences: u32,
    pub total_batches: u32,
    /// Set when the stream ended with an error
    pub error: Option<String>,
}

fn is_separator(c: char) -> bool {
    c == ':' || c == '：'
}

/// Parse one script line into a speaker and its text
///
/// The line is split at the first ASCII or full-width colon. Lines whose
/// speaker is unknown, whose text is shorter than `min_chars`, or whose text
/// starts or ends with a colon are rejected.
pub fn parse_line(line: &str, min_chars: usize) -> Option<(Speaker, String)> {
    let (raw_speaker, rest) = line.trim().split_once(is_separator)?;
    let speaker = Speaker::from_alias(raw_speaker)?;
    let text = rest.trim();
    if text.chars().count() < min_chars
        || text.starts_with(is_separator)
        || text.ends_with(is_separator)
    {
        return None;
    }
    Some((speaker, text.to_string()))
}

/// Accumulates deltas and yields complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and drain every newline-terminated line
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }

    /// Take the unterminated remainder, if any
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        (!rest.trim().is_empty()).then_some(rest)
    }
}

/// Validates lines, numbers sentences and ships full batches
struct SentenceSink {
    builder: BatchBuilder,
    sequence: u32,
    min_chars: usize,
    trace_id: Option<String>,
    tx: mpsc::Sender<ProducerMessage>,
}

impl SentenceSink {
    async fn send(&self, message: ProducerMessage) -> Result<(), ApplicationError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ApplicationError::Cancelled)
    }

    async fn accept(&mut self, line: &str) -> Result<(), ApplicationError> {
        let Some((speaker, text)) = parse_line(line, self.min_chars) else {
            debug!(line, "Dropping malformed script line");
            return Ok(());
        };
        self.sequence += 1;
        let sentence = Sentence::new(speaker, text, self.sequence);
        debug!(sequence = self.sequence, %speaker, "Script sentence accepted");
        if let Some(batch) = self.builder.push(sentence) {
            debug!(batch = batch.batch_number(), size = batch.len(), "Batch full");
            self.send(ProducerMessage::Batch(batch)).await?;
        }
        Ok(())
    }

    async fn finish(mut self, error: Option<String>) {
        if let Some(batch) = self.builder.flush() {
            debug!(batch = batch.batch_number(), size = batch.len(), "Flushing final batch");
            if self.send(ProducerMessage::Batch(batch)).await.is_err() {
                return;
            }
        }
        let summary = ProducerSummary {
            trace_id: self.trace_id.take(),
            total_sentences: self.sequence,
            total_batches: self.builder.emitted(),
            error,
        };
        info!(
            sentences = summary.total_sentences,
            batches = summary.total_batches,
            "Script stream finished"
        );
        if self.send(ProducerMessage::Done(summary)).await.is_err() {
            debug!("Batch queue closed before completion marker");
        }
    }
}

/// Script stream producer
pub struct ScriptProducer {
    text: Arc<dyn TextGenerationPort>,
    batch_size: usize,
    min_chars: usize,
}

impl std::fmt::Debug for ScriptProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptProducer")
            .field("batch_size", &self.batch_size)
            .field("min_chars", &self.min_chars)
            .finish_non_exhaustive()
    }
}

impl ScriptProducer {
    pub fn new(text: Arc<dyn TextGenerationPort>, config: &PipelineConfig) -> Self {
        Self {
            text,
            batch_size: config.batch_size,
            min_chars: config.min_sentence_chars,
        }
    }

    /// Run on a new task feeding a queue of `capacity` messages
    pub fn spawn(
        self,
        prompt: String,
        capacity: usize,
        cancel: CancelToken,
    ) -> (mpsc::Receiver<ProducerMessage>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(self.run(prompt, tx, cancel));
        (rx, handle)
    }

    /// Stream the script into `tx`
    ///
    /// Stream errors still flush the partial batch and send the completion
    /// marker. Cancellation, or a closed queue, ends the task silently.
    #[instrument(skip_all, fields(batch_size = self.batch_size))]
    pub async fn run(
        self,
        prompt: String,
        tx: mpsc::Sender<ProducerMessage>,
        cancel: CancelToken,
    ) {
        let mut sink = SentenceSink {
            builder: BatchBuilder::new(self.batch_size),
            sequence: 0,
            min_chars: self.min_chars,
            trace_id: None,
            tx,
        };
        let error = match self.stream_into(&prompt, &mut sink, &cancel).await {
            Ok(()) => None,
            Err(ApplicationError::Cancelled) => {
                debug!("Script producer stopped before completion");
                return;
            },
            Err(e) => {
                warn!(error = %e, "Script stream failed, flushing what was parsed");
                Some(e.to_string())
            },
        };
        sink.finish(error).await;
    }

    async fn stream_into(
        &self,
        prompt: &str,
        sink: &mut SentenceSink,
        cancel: &CancelToken,
    ) -> Result<(), ApplicationError> {
        let mut stream = cancel
            .run_until_cancelled(self.text.generate_stream(prompt))
            .await??;
        sink.trace_id.clone_from(&stream.trace_id);
        sink.send(ProducerMessage::Started {
            trace_id: stream.trace_id.clone(),
        })
        .await?;

        let mut lines = LineBuffer::new();
        while let Some(delta) = cancel.run_until_cancelled(stream.deltas.next()).await? {
            for line in lines.push(&delta?) {
                sink.accept(&line).await?;
            }
        }
        if let Some(rest) = lines.finish() {
            sink.accept(&rest).await?;
        }
        Ok(())
    }
}
