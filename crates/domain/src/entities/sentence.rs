//! Script sentences and the batches they travel in

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value_objects::Speaker;

/// One validated script line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    speaker: Speaker,
    text: String,
    sequence: u32,
}

impl Sentence {
    /// Create a sentence; `sequence` is 1-based in generation order
    pub fn new(speaker: Speaker, text: impl Into<String>, sequence: u32) -> Self {
        Self {
            speaker,
            text: text.into(),
            sequence,
        }
    }

    pub const fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Transcript form, `"Speaker1: text"`
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.speaker, self.text)
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)
    }
}

/// Ordered group of consecutive sentences synthesized together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    batch_number: u32,
    sentences: Vec<Sentence>,
}

impl Batch {
    pub fn new(batch_number: u32, sentences: Vec<Sentence>) -> Self {
        Self {
            batch_number,
            sentences,
        }
    }

    pub const fn batch_number(&self) -> u32 {
        self.batch_number
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// Accumulates sentences into fixed-size batches
///
/// Batch numbers start at 1 and increase by one per emitted batch.
#[derive(Debug)]
pub struct BatchBuilder {
    target_size: usize,
    next_number: u32,
    pending: Vec<Sentence>,
}

impl BatchBuilder {
    /// Create a builder; a zero target is treated as one
    pub fn new(target_size: usize) -> Self {
        let target_size = target_size.max(1);
        Self {
            target_size,
            next_number: 1,
            pending: Vec::with_capacity(target_size),
        }
    }

    /// Add a sentence, returning a batch once the target size is reached
    pub fn push(&mut self, sentence: Sentence) -> Option<Batch> {
        self.pending.push(sentence);
        if self.pending.len() >= self.target_size {
            self.take()
        } else {
            None
        }
    }

    /// Emit the partial batch, if any
    pub fn flush(&mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            None
        } else {
            self.take()
        }
    }

    /// Number of batches emitted so far
    pub const fn emitted(&self) -> u32 {
        self.next_number - 1
    }

    fn take(&mut self) -> Option<Batch> {
        let sentences = std::mem::replace(&mut self.pending, Vec::with_capacity(self.target_size));
        let batch = Batch::new(self.next_number, sentences);
        self.next_number += 1;
        Some(batch)
    }
}
