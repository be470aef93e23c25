//! Scrub driver: polls the evaluated time and rebuilds activation state when the
//! playhead moved or the inspected context changed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activation::{ActivationChange, ActivationReceiver, ActivationSink};
use crate::binding::TargetResolver;
use crate::config::ScrubConfig;
use crate::ids::ContextId;
use crate::timeline::Timeline;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSample {
    pub context: ContextId,
    pub time: f32,
}

/// Current evaluation time of whatever is being scrubbed. `None` while nothing is
/// inspected or the source is in a transient state.
pub trait TimeQuery {
    fn sample(&self) -> Option<TimeSample>;
}

impl TimeQuery for TimeSample {
    fn sample(&self) -> Option<TimeSample> {
        Some(*self)
    }
}

#[derive(Clone, Debug)]
pub struct ScrubDriver {
    epsilon: f32,
    last_context: Option<ContextId>,
    last_time: Option<f32>,
}

impl Default for ScrubDriver {
    fn default() -> Self {
        Self::new(&ScrubConfig::default())
    }
}

impl ScrubDriver {
    pub fn new(cfg: &ScrubConfig) -> Self {
        Self {
            epsilon: cfg.epsilon.max(0.0),
            last_context: None,
            last_time: None,
        }
    }

    /// Force a rebuild on the next poll.
    pub fn invalidate(&mut self) {
        self.last_context = None;
        self.last_time = None;
    }

    /// The sample to rebuild at, if the context changed or time moved more than epsilon.
    pub fn poll(&mut self, query: &dyn TimeQuery) -> Option<TimeSample> {
        let sample = query.sample()?;
        if !sample.time.is_finite() {
            return None;
        }
        let context_changed = self.last_context != Some(sample.context);
        let time_changed = self
            .last_time
            .map_or(true, |last| (sample.time - last).abs() > self.epsilon);
        if !context_changed && !time_changed {
            return None;
        }
        self.last_context = Some(sample.context);
        self.last_time = Some(sample.time);
        Some(sample)
    }

    /// Poll, and on change rebuild every receiver bound to the sampled context that
    /// allows scrub application. `None` when nothing was rebuilt.
    pub fn tick(
        &mut self,
        query: &dyn TimeQuery,
        timeline: &Timeline,
        receivers: &mut [ActivationReceiver],
        resolver: &dyn TargetResolver,
        sink: &mut dyn ActivationSink,
    ) -> Option<(TimeSample, Vec<ActivationChange>)> {
        let sample = self.poll(query)?;
        let mut changes = Vec::new();
        for receiver in receivers.iter_mut() {
            if receiver.context() != Some(sample.context) || !receiver.config().apply_during_scrub {
                continue;
            }
            changes.extend(receiver.rebuild_to_time(timeline, sample.time, resolver, sink));
        }
        debug!(time = sample.time, changes = changes.len(), "scrub: rebuilt");
        Some((sample, changes))
    }
}
