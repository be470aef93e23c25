//! Error types for follower commands.

use serde::{Deserialize, Serialize};
use stagehand_injection::{Diagnostic, DiagnosticCategory};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MotionError {
    /// A resume asked to both stop the active injection and play a new clip.
    #[error("resume cannot both stop the active injection and play clip '{clip}'")]
    ContradictoryInjection { clip: String },

    #[error("follower has no path")]
    MissingPath,

    #[error("follower has no target to move")]
    MissingTarget,
}

impl MotionError {
    pub fn category(&self) -> DiagnosticCategory {
        match self {
            MotionError::ContradictoryInjection { .. } => DiagnosticCategory::InvalidRequest,
            MotionError::MissingPath | MotionError::MissingTarget => {
                DiagnosticCategory::Unreachable
            }
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.category(), "follower", self.to_string())
    }
}
