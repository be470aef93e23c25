//! Clip collaborator traits and a plain in-memory implementation.
//!
//! The host engine owns real clip data. The injector only needs to know a clip's
//! length, whether it was authored as looping, and to drive a playback instance's
//! time and speed. `ClipData`/`ClipPlayback` cover tests and headless hosts.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A playback instance of a clip, connected to the override input of a blend graph.
pub trait ClipSource: fmt::Debug {
    /// Clip length in seconds.
    fn length(&self) -> f32;
    /// Whether the clip was authored as looping.
    fn is_looping(&self) -> bool;
    /// Current local time in seconds.
    fn time(&self) -> f32;
    fn set_time(&mut self, time: f32);
    fn speed(&self) -> f32;
    fn set_speed(&mut self, speed: f32);
    /// Advance the source's own clock, as host graph evaluation does each frame.
    fn advance(&mut self, dt: f32);
}

/// An authored clip the injector can create playback instances from.
pub trait ClipAsset: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn length(&self) -> f32;
    fn is_looping(&self) -> bool;
    fn instantiate(&self) -> Box<dyn ClipSource>;
}

/// Shared reference to an authored clip.
pub type ClipRef = Arc<dyn ClipAsset>;

/// Wrap `time` into `[0, length)`. Negative times wrap from the end.
pub fn wrap_time(time: f32, length: f32) -> f32 {
    if length <= 0.0 || !time.is_finite() {
        return 0.0;
    }
    let m = time % length;
    let wrapped = if m < 0.0 { m + length } else { m };
    if wrapped >= length {
        0.0
    } else {
        wrapped
    }
}

/// Minimal clip description (name, length, loop flag).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClipData {
    pub name: String,
    /// Length in seconds.
    pub length: f32,
    #[serde(default)]
    pub looping: bool,
}

impl ClipData {
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            length,
            looping: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn into_ref(self) -> ClipRef {
        Arc::new(self)
    }
}

impl ClipAsset for ClipData {
    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> f32 {
        self.length
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn instantiate(&self) -> Box<dyn ClipSource> {
        Box::new(ClipPlayback::new(self.length, self.looping))
    }
}

/// Playback clock over a `ClipData`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipPlayback {
    length: f32,
    looping: bool,
    time: f32,
    speed: f32,
}

impl ClipPlayback {
    pub fn new(length: f32, looping: bool) -> Self {
        Self {
            length: length.max(0.0),
            looping,
            time: 0.0,
            speed: 1.0,
        }
    }
}

impl ClipSource for ClipPlayback {
    fn length(&self) -> f32 {
        self.length
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn set_time(&mut self, time: f32) {
        self.time = if time.is_finite() { time } else { 0.0 };
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn advance(&mut self, dt: f32) {
        if self.speed == 0.0 || dt <= 0.0 {
            return;
        }
        let next = self.time + dt * self.speed;
        self.time = if self.looping {
            wrap_time(next, self.length)
        } else {
            next.clamp(0.0, self.length)
        };
    }
}
