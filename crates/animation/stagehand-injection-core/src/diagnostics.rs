//! Diagnostic channel shared by the Stagehand cores.
//!
//! Refused requests never abort the frame loop. They are returned as errors,
//! logged, and pushed into the component's outputs as a `Diagnostic`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    /// Missing clip, contradictory command, missing target, bad numeric payload.
    InvalidRequest,
    /// Operation on a graph or handle that was already torn down.
    StaleHandle,
    /// Path, follower or target reference could not be reached.
    Unreachable,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    /// Component that reported it (e.g. "injector", "follower", "dispatch").
    pub source: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        category: DiagnosticCategory,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            source: source.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self.category {
            DiagnosticCategory::StaleHandle => Severity::Info,
            DiagnosticCategory::InvalidRequest | DiagnosticCategory::Unreachable => {
                Severity::Warning
            }
        }
    }

    /// Log through `tracing` at a level matching the severity.
    pub fn log(&self) {
        match self.severity() {
            Severity::Info => debug!(source = %self.source, "{}", self.message),
            Severity::Warning => warn!(source = %self.source, "{}", self.message),
        }
    }
}
