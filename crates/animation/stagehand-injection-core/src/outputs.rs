//! Output contracts from the injector.
//!
//! Outputs carry the layer state after this tick and the semantic events raised
//! since the previous tick (including those raised by play/stop calls in between).

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::graph::LayerSample;
use crate::ids::SessionId;
use crate::injector::Phase;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum InjectionEvent {
    /// A request is waiting for the active session to drain.
    Queued { session: SessionId, clip: String },
    /// A queued request was replaced by a newer one before it started.
    Superseded { session: SessionId, clip: String },
    Started { session: SessionId, clip: String },
    Connected { session: SessionId, clip: String },
    FadeInComplete { session: SessionId },
    AbortRequested {
        session: SessionId,
        fade_out: Option<f32>,
    },
    /// Holding ended, either naturally or through an abort.
    HoldComplete { session: SessionId, aborted: bool },
    Disconnected { session: SessionId, clip: String },
    Completed { session: SessionId, clip: String },
    Diagnostic(Diagnostic),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InjectionOutputs {
    pub phase: Phase,
    pub weight: f32,
    pub session: Option<SessionId>,
    pub layer: LayerSample,
    #[serde(default)]
    pub events: Vec<InjectionEvent>,
}

impl InjectionOutputs {
    #[inline]
    pub fn clear(&mut self) {
        self.phase = Phase::Idle;
        self.weight = 0.0;
        self.session = None;
        self.layer = LayerSample::default();
        self.events.clear();
    }

    #[inline]
    pub fn push_event(&mut self, event: InjectionEvent) {
        self.events.push(event);
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter_map(|e| match e {
            InjectionEvent::Diagnostic(d) => Some(d),
            _ => None,
        })
    }
}
