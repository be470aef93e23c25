//! Authored marker records. Immutable once loaded.

use serde::{Deserialize, Serialize};

use crate::ids::TargetId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathCommand {
    Pause,
    Resume,
    Stop,
    Unstop,
    SetSpeedMultiplier,
    /// Teleport; ignores pause and stop.
    WarpToT,
    /// Set `t`, respecting pause and stop.
    SetT,
    /// Hot-swap to an indexed path.
    NewSpline,
}

fn default_value() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathCommandMarker {
    pub time: f32,
    pub command: PathCommand,
    /// Payload: multiplier, `t`, or start `t` for `NewSpline`.
    #[serde(default = "default_value")]
    pub value: f32,
    /// Index into the receiver's ordered paths (`NewSpline`).
    #[serde(default)]
    pub path_index: usize,
    /// Clip library key for Pause/Resume/Stop.
    #[serde(default)]
    pub clip: Option<String>,
    #[serde(default = "default_true")]
    pub return_to_base: bool,
    /// Resume only: stop the active injection.
    #[serde(default)]
    pub stop_injection: bool,
}

impl PathCommandMarker {
    pub fn new(time: f32, command: PathCommand) -> Self {
        Self {
            time,
            command,
            value: default_value(),
            path_index: 0,
            clip: None,
            return_to_base: true,
            stop_injection: false,
        }
    }

    pub fn value(mut self, value: f32) -> Self {
        self.value = value;
        self
    }

    pub fn path_index(mut self, index: usize) -> Self {
        self.path_index = index;
        self
    }

    pub fn clip(mut self, key: impl Into<String>) -> Self {
        self.clip = Some(key.into());
        self
    }

    pub fn return_to_base(mut self, return_to_base: bool) -> Self {
        self.return_to_base = return_to_base;
        self
    }

    pub fn stop_injection(mut self, stop: bool) -> Self {
        self.stop_injection = stop;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationCommand {
    Activate,
    Deactivate,
}

impl ActivationCommand {
    #[inline]
    pub fn active(self) -> bool {
        matches!(self, ActivationCommand::Activate)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivationMarker {
    pub time: f32,
    pub command: ActivationCommand,
    /// Target the track's binding; falls back to `override_target` when unbound.
    #[serde(default = "default_true")]
    pub use_track_binding: bool,
    #[serde(default)]
    pub override_target: Option<TargetId>,
    /// Remember the state this marker set on the receiver.
    #[serde(default = "default_true")]
    pub sticky: bool,
    /// Apply while scrubbing/evaluating, not only while playing.
    #[serde(default = "default_true")]
    pub apply_during_scrub: bool,
}

impl ActivationMarker {
    pub fn new(time: f32, command: ActivationCommand) -> Self {
        Self {
            time,
            command,
            use_track_binding: true,
            override_target: None,
            sticky: true,
            apply_during_scrub: true,
        }
    }

    pub fn activate(time: f32) -> Self {
        Self::new(time, ActivationCommand::Activate)
    }

    pub fn deactivate(time: f32) -> Self {
        Self::new(time, ActivationCommand::Deactivate)
    }

    /// Target `target` explicitly instead of the track binding.
    pub fn targeting(mut self, target: TargetId) -> Self {
        self.use_track_binding = false;
        self.override_target = Some(target);
        self
    }

    pub fn fallback(mut self, target: TargetId) -> Self {
        self.override_target = Some(target);
        self
    }

    pub fn sticky(mut self, sticky: bool) -> Self {
        self.sticky = sticky;
        self
    }

    pub fn apply_during_scrub(mut self, apply: bool) -> Self {
        self.apply_during_scrub = apply;
        self
    }
}
