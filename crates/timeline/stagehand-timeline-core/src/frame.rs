//! Per-step output of a [`Stage`](crate::stage::Stage).

use serde::{Deserialize, Serialize};
use stagehand_injection::{Diagnostic, InjectionEvent, Phase, SubjectId};
use stagehand_motion::Pose;

use crate::activation::ActivationChange;
use crate::ids::{FollowerId, TrackId};
use crate::markers::{ActivationCommand, PathCommand};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DispatchedCommand {
    Path(PathCommand),
    Activation(ActivationCommand),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StageEvent {
    /// A marker was delivered live.
    Dispatched {
        track: TrackId,
        time: f32,
        command: DispatchedCommand,
    },
    Activation(ActivationChange),
    /// Activation state was rebuilt from history at `time`.
    Rebuilt { time: f32, targets: usize },
    Diagnostic(Diagnostic),
    Injection {
        subject: SubjectId,
        event: InjectionEvent,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FollowerPose {
    pub follower: FollowerId,
    pub t: f32,
    pub pose: Pose,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerWeight {
    pub subject: SubjectId,
    pub phase: Phase,
    pub weight: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StageFrame {
    pub epoch: u64,
    pub dt: f32,
    /// Playback time after this step.
    pub time: f32,
    #[serde(default)]
    pub poses: Vec<FollowerPose>,
    #[serde(default)]
    pub weights: Vec<LayerWeight>,
    /// Activation writes made during this step, live or rebuilt.
    #[serde(default)]
    pub activations: Vec<ActivationChange>,
    #[serde(default)]
    pub events: Vec<StageEvent>,
}

impl StageFrame {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter_map(|e| match e {
            StageEvent::Diagnostic(d) => Some(d),
            StageEvent::Injection {
                event: InjectionEvent::Diagnostic(d),
                ..
            } => Some(d),
            _ => None,
        })
    }
}
