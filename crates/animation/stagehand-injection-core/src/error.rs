//! Error types for override requests.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticCategory};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum InjectionError {
    /// The play call carried no clip.
    #[error("override request has no clip")]
    MissingClip,

    /// Zero or non-finite playback speed.
    #[error("invalid playback speed {speed} for clip '{clip}'")]
    InvalidSpeed { clip: String, speed: f32 },

    /// Non-finite fade duration or weight.
    #[error("invalid {field} value {value} for clip '{clip}'")]
    InvalidValue {
        clip: String,
        field: String,
        value: f32,
    },
}

impl InjectionError {
    pub fn category(&self) -> DiagnosticCategory {
        DiagnosticCategory::InvalidRequest
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.category(), "injector", self.to_string())
    }
}
