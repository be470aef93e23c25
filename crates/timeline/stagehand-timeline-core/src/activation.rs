//! Activation receiver: live Activate/Deactivate notifications and deterministic
//! rebuild of every referenced target's state at an arbitrary time.

use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::binding::{resolve_activation_target, TargetResolver};
use crate::config::ActivationConfig;
use crate::error::DispatchError;
use crate::ids::{ContextId, TargetId, TrackId};
use crate::markers::ActivationMarker;
use crate::timeline::Timeline;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    Playing,
    /// Paused, scrubbing or previewing.
    #[default]
    Evaluating,
}

/// Where active flags are written. Hosts forward to their scene objects.
pub trait ActivationSink {
    fn is_active(&self, target: TargetId) -> Option<bool>;
    fn set_active(&mut self, target: TargetId, active: bool);
}

/// In-memory active flags, kept in first-touched order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationStates {
    states: IndexMap<TargetId, bool>,
}

impl ActivationStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, target: TargetId) -> Option<bool> {
        self.states.get(&target).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetId, bool)> + '_ {
        self.states.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl ActivationSink for ActivationStates {
    fn is_active(&self, target: TargetId) -> Option<bool> {
        self.get(target)
    }

    fn set_active(&mut self, target: TargetId, active: bool) {
        self.states.insert(target, active);
    }
}

/// One write to a target's active flag.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivationChange {
    pub target: TargetId,
    pub active: bool,
    /// State before the write, if the sink knew it.
    pub previous: Option<bool>,
}

fn apply(sink: &mut dyn ActivationSink, target: TargetId, active: bool) -> ActivationChange {
    let previous = sink.is_active(target);
    sink.set_active(target, active);
    ActivationChange {
        target,
        active,
        previous,
    }
}

#[derive(Clone, Debug, Default)]
pub struct ActivationReceiver {
    cfg: ActivationConfig,
    context: Option<ContextId>,
    /// Last state set by a sticky marker, per target.
    remembered: HashMap<TargetId, bool>,
}

impl ActivationReceiver {
    pub fn new(cfg: ActivationConfig, context: Option<ContextId>) -> Self {
        Self {
            cfg,
            context,
            remembered: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ActivationConfig {
        &self.cfg
    }

    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    pub fn set_context(&mut self, context: Option<ContextId>) {
        self.context = context;
    }

    pub fn remembered_state(&self, target: TargetId) -> Option<bool> {
        self.remembered.get(&target).copied()
    }

    fn remember(&mut self, marker: &ActivationMarker, target: TargetId, active: bool) {
        if marker.sticky {
            self.remembered.insert(target, active);
        }
    }

    /// Apply one live notification.
    ///
    /// Without a context nothing happens. While not playing, the notification applies
    /// only if both this receiver and the marker allow scrub application.
    pub fn on_notify(
        &mut self,
        track: TrackId,
        marker: &ActivationMarker,
        state: PlayState,
        resolver: &dyn TargetResolver,
        sink: &mut dyn ActivationSink,
    ) -> Result<Option<ActivationChange>, DispatchError> {
        let Some(context) = self.context else {
            trace!("activation: receiver has no context");
            return Ok(None);
        };
        if state != PlayState::Playing && !(self.cfg.apply_during_scrub && marker.apply_during_scrub)
        {
            trace!(time = marker.time, "activation: gated while evaluating");
            return Ok(None);
        }
        let target = resolve_activation_target(resolver, context, track, marker).ok_or(
            DispatchError::TargetUnresolved {
                track,
                time: marker.time,
            },
        )?;
        let active = marker.command.active();
        self.remember(marker, target, active);
        debug!(target = target.0, active, time = marker.time, "activation: live");
        Ok(Some(apply(sink, target, active)))
    }

    /// Every target referenced by a scrub-applicable, resolvable marker, in first-seen
    /// order, with the latest marker at or before `time` (later-authored on ties).
    /// Markers with a non-finite time never fire live, so they are skipped here too.
    fn winners<'t>(
        &self,
        timeline: &'t Timeline,
        time: f32,
        resolver: &dyn TargetResolver,
    ) -> IndexMap<TargetId, Option<&'t ActivationMarker>> {
        let mut winners: IndexMap<TargetId, Option<&'t ActivationMarker>> = IndexMap::new();
        let Some(context) = self.context else {
            return winners;
        };
        for (track, marker) in timeline.activation_markers() {
            if !marker.apply_during_scrub || !marker.time.is_finite() {
                continue;
            }
            let Some(target) = resolve_activation_target(resolver, context, track, marker) else {
                continue;
            };
            let slot = winners.entry(target).or_insert(None);
            if marker.time > time {
                continue;
            }
            if slot.map_or(true, |existing| marker.time >= existing.time) {
                *slot = Some(marker);
            }
        }
        winners
    }

    /// Decide every referenced target's state at `time` without writing anything.
    /// Targets with no qualifying marker get the configured default.
    pub fn plan_rebuild(
        &self,
        timeline: &Timeline,
        time: f32,
        resolver: &dyn TargetResolver,
    ) -> IndexMap<TargetId, bool> {
        let fallback = self.cfg.default_active_when_no_marker;
        self.winners(timeline, time, resolver)
            .into_iter()
            .map(|(target, marker)| (target, marker.map_or(fallback, |m| m.command.active())))
            .collect()
    }

    /// Rebuild targets to their state at `time`. Every target is decided before any
    /// is written.
    pub fn rebuild_to_time(
        &mut self,
        timeline: &Timeline,
        time: f32,
        resolver: &dyn TargetResolver,
        sink: &mut dyn ActivationSink,
    ) -> Vec<ActivationChange> {
        let fallback = self.cfg.default_active_when_no_marker;
        let plan: Vec<(TargetId, bool, bool)> = self
            .winners(timeline, time, resolver)
            .into_iter()
            .map(|(target, marker)| match marker {
                Some(m) => (target, m.command.active(), m.sticky),
                None => (target, fallback, false),
            })
            .collect();
        debug!(time, targets = plan.len(), "activation: rebuild");

        plan.into_iter()
            .map(|(target, active, sticky)| {
                if sticky {
                    self.remembered.insert(target, active);
                }
                apply(sink, target, active)
            })
            .collect()
    }
}
