//! Marker sequencer: decides which markers fire as playback time moves.
//!
//! Forward motion fires every marker in `(previous, now]`, ordered by time with
//! authoring order kept on ties, including markers skipped over by a large step.
//! Backward motion and explicit seeks never replay markers live; they ask for a
//! rebuild at the new time.

use tracing::trace;

use crate::timeline::{MarkerAddress, Timeline};

#[derive(Clone, Debug, PartialEq)]
pub enum Advance {
    Fire(Vec<MarkerAddress>),
    Rebuild(f32),
}

#[derive(Clone, Debug, Default)]
pub struct MarkerSequencer {
    /// `None` before the first advance: markers at the start time still fire.
    last: Option<f32>,
}

impl MarkerSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_time(&self) -> Option<f32> {
        self.last
    }

    /// Forget the position; the next advance fires everything up to its time.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Move the position without firing anything.
    pub fn sync(&mut self, time: f32) {
        self.last = Some(time);
    }

    pub fn advance(&mut self, timeline: &Timeline, now: f32) -> Advance {
        match self.last {
            Some(prev) if now < prev => {
                trace!(prev, now, "sequencer: backward jump");
                self.last = Some(now);
                Advance::Rebuild(now)
            }
            prev => {
                self.last = Some(now);
                Advance::Fire(timeline.markers_in(prev, now))
            }
        }
    }

    pub fn seek(&mut self, now: f32) -> Advance {
        self.last = Some(now);
        Advance::Rebuild(now)
    }
}
