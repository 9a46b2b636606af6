//! Append-only registry of remote trace identifiers

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maps a logical operation name to the trace id returned by the remote call
///
/// Entries are never overwritten: the first id recorded for a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceRegistry(BTreeMap<String, String>);

impl TraceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trace id; returns `false` if the key was already present
    pub fn record(&mut self, operation: impl Into<String>, trace_id: impl Into<String>) -> bool {
        let operation = operation.into();
        if self.0.contains_key(&operation) {
            return false;
        }
        self.0.insert(operation, trace_id.into());
        true
    }

    /// Record every entry of another registry
    pub fn extend(&mut self, other: &Self) {
        for (op, id) in other.iter() {
            self.record(op, id);
        }
    }

    pub fn get(&self, operation: &str) -> Option<&str> {
        self.0.get(operation).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
