//! Target resolution for markers.
//!
//! A marker reaches its target either through its track's binding in the playback
//! context, or through an explicit per-marker reference resolved in that context.
//! Hosts implement [`TargetResolver`]; [`Bindings`] is the in-memory table.

use hashbrown::{HashMap, HashSet};

use crate::ids::{ContextId, FollowerId, TargetId, TrackId};
use crate::markers::ActivationMarker;

pub trait TargetResolver {
    /// Activation target bound to `track` in `context`.
    fn track_target(&self, context: ContextId, track: TrackId) -> Option<TargetId>;

    /// Resolve an explicit reference; `None` when it does not exist in `context`.
    fn resolve_reference(&self, context: ContextId, target: TargetId) -> Option<TargetId>;

    /// Follower bound to a path-command track in `context`.
    fn track_follower(&self, context: ContextId, track: TrackId) -> Option<FollowerId>;
}

/// Resolve an activation marker's target. Track-binding markers fall back to their
/// override reference when the track is unbound.
pub fn resolve_activation_target(
    resolver: &dyn TargetResolver,
    context: ContextId,
    track: TrackId,
    marker: &ActivationMarker,
) -> Option<TargetId> {
    let reference = marker
        .override_target
        .and_then(|t| resolver.resolve_reference(context, t));
    if marker.use_track_binding {
        resolver.track_target(context, track).or(reference)
    } else {
        reference
    }
}

#[derive(Debug, Default, Clone)]
pub struct Bindings {
    targets: HashMap<(ContextId, TrackId), TargetId>,
    followers: HashMap<(ContextId, TrackId), FollowerId>,
    known: HashSet<(ContextId, TargetId)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an activation track to a target; the target also becomes resolvable by reference.
    pub fn bind_track(&mut self, context: ContextId, track: TrackId, target: TargetId) {
        self.targets.insert((context, track), target);
        self.known.insert((context, target));
    }

    pub fn unbind_track(&mut self, context: ContextId, track: TrackId) -> Option<TargetId> {
        self.targets.remove(&(context, track))
    }

    pub fn bind_follower(&mut self, context: ContextId, track: TrackId, follower: FollowerId) {
        self.followers.insert((context, track), follower);
    }

    /// Make `target` resolvable by explicit reference in `context`.
    pub fn register_target(&mut self, context: ContextId, target: TargetId) {
        self.known.insert((context, target));
    }

    pub fn forget_target(&mut self, context: ContextId, target: TargetId) {
        self.known.remove(&(context, target));
    }
}

impl TargetResolver for Bindings {
    fn track_target(&self, context: ContextId, track: TrackId) -> Option<TargetId> {
        self.targets.get(&(context, track)).copied()
    }

    fn resolve_reference(&self, context: ContextId, target: TargetId) -> Option<TargetId> {
        self.known.contains(&(context, target)).then_some(target)
    }

    fn track_follower(&self, context: ContextId, track: TrackId) -> Option<FollowerId> {
        self.followers.get(&(context, track)).copied()
    }
}
