//! Run-level state machine

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Stage of a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    WelcomeSynthesis,
    ScriptAndCoverConcurrent,
    OutroAppend,
    CoverJoin,
    FinalMerge,
    Complete,
    Failed,
}

impl PipelineStage {
    /// The stage that follows on the success path
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::WelcomeSynthesis => Some(Self::ScriptAndCoverConcurrent),
            Self::ScriptAndCoverConcurrent => Some(Self::OutroAppend),
            Self::OutroAppend => Some(Self::CoverJoin),
            Self::CoverJoin => Some(Self::FinalMerge),
            Self::FinalMerge => Some(Self::Complete),
            Self::Complete | Self::Failed => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Move to `target`, allowing only the next stage or `Failed`
    pub fn transition(self, target: Self) -> Result<Self, DomainError> {
        let allowed = match target {
            Self::Failed => !self.is_terminal(),
            _ => self.next() == Some(target),
        };
        if allowed {
            Ok(target)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WelcomeSynthesis => "welcome_synthesis",
            Self::ScriptAndCoverConcurrent => "script_and_cover_concurrent",
            Self::OutroAppend => "outro_append",
            Self::CoverJoin => "cover_join",
            Self::FinalMerge => "final_merge",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
