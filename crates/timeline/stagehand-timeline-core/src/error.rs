//! Dispatch errors. None of these stop the frame; the stage turns them into diagnostics.

use serde::{Deserialize, Serialize};
use stagehand_injection::{Diagnostic, DiagnosticCategory, InjectionError};
use stagehand_motion::MotionError;

use crate::ids::{FollowerId, TrackId};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("marker at {time}s on track {track:?} resolved to no target")]
    TargetUnresolved { track: TrackId, time: f32 },

    #[error("path index {index} out of range ({count} paths)")]
    PathIndexOutOfRange { index: usize, count: usize },

    #[error("unknown clip '{key}'")]
    UnknownClip { key: String },

    #[error("unknown follower {0:?}")]
    UnknownFollower(FollowerId),

    /// A command produced a clip request but the follower animates no subject.
    #[error("follower {0:?} has no injector to receive clip requests")]
    MissingInjector(FollowerId),

    #[error(transparent)]
    Motion(#[from] MotionError),

    #[error(transparent)]
    Injection(#[from] InjectionError),
}

impl DispatchError {
    pub fn category(&self) -> DiagnosticCategory {
        match self {
            DispatchError::TargetUnresolved { .. }
            | DispatchError::PathIndexOutOfRange { .. }
            | DispatchError::UnknownFollower(_) => DiagnosticCategory::Unreachable,
            DispatchError::UnknownClip { .. } | DispatchError::MissingInjector(_) => {
                DiagnosticCategory::InvalidRequest
            }
            DispatchError::Motion(e) => e.category(),
            DispatchError::Injection(e) => e.category(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.category(), "dispatch", self.to_string())
    }
}
