//! Linear weight fades over elapsed time.

use serde::{Deserialize, Serialize};

#[inline]
fn lerp_f(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fade {
    pub from: f32,
    pub to: f32,
    pub duration: f32,
    pub elapsed: f32,
}

/// Result of advancing a fade by one slice of time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FadeStep {
    Running(f32),
    /// Reached `to`; `leftover` is the part of the slice past completion.
    Finished { weight: f32, leftover: f32 },
}

impl Fade {
    pub fn new(from: f32, to: f32, duration: f32) -> Self {
        Self {
            from,
            to,
            duration: if duration.is_finite() { duration } else { 0.0 },
            elapsed: 0.0,
        }
    }

    /// A fade of non-positive duration snaps.
    #[inline]
    pub fn is_instant(&self) -> bool {
        self.duration <= 0.0
    }

    pub fn value(&self) -> f32 {
        if self.is_instant() {
            return self.to;
        }
        lerp_f(self.from, self.to, (self.elapsed / self.duration).clamp(0.0, 1.0))
    }

    pub fn remaining(&self) -> f32 {
        (self.duration - self.elapsed).max(0.0)
    }

    pub fn advance(&mut self, dt: f32) -> FadeStep {
        if self.is_instant() {
            return FadeStep::Finished {
                weight: self.to,
                leftover: dt.max(0.0),
            };
        }
        self.elapsed += dt.max(0.0);
        if self.elapsed >= self.duration {
            let leftover = self.elapsed - self.duration;
            self.elapsed = self.duration;
            FadeStep::Finished {
                weight: self.to,
                leftover,
            }
        } else {
            FadeStep::Running(self.value())
        }
    }
}
