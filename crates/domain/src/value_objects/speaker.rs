//! Speaker identity and alias normalization

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two podcast voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Speaker {
    Speaker1,
    Speaker2,
}

/// Exact-match alias table, consulted before the lowercase fallback
const ALIASES: &[(&str, Speaker)] = &[
    ("Speaker1", Speaker::Speaker1),
    ("speaker1", Speaker::Speaker1),
    ("Mini", Speaker::Speaker1),
    ("mini", Speaker::Speaker1),
    ("1", Speaker::Speaker1),
    ("小", Speaker::Speaker1),
    ("Speaker2", Speaker::Speaker2),
    ("speaker2", Speaker::Speaker2),
    ("Max", Speaker::Speaker2),
    ("max", Speaker::Speaker2),
    ("2", Speaker::Speaker2),
    ("大", Speaker::Speaker2),
];

impl Speaker {
    /// Canonical label used in script lines and trace keys
    pub const fn label(self) -> &'static str {
        match self {
            Self::Speaker1 => "Speaker1",
            Self::Speaker2 => "Speaker2",
        }
    }

    /// Normalize a raw speaker token from a script line
    ///
    /// Surrounding whitespace is ignored. Returns `None` for tokens that name
    /// neither speaker.
    pub fn from_alias(raw: &str) -> Option<Self> {
        let token = raw.trim();
        if let Some((_, speaker)) = ALIASES.iter().find(|(alias, _)| *alias == token) {
            return Some(*speaker);
        }
        let lowered = token.to_lowercase();
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map(|(_, speaker)| *speaker)
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
