//! Path command receiver: applies path-command markers to a follower, one
//! notification at a time, and forwards clip requests to the subject's injector.

use stagehand_injection::AnimInjection;
use stagehand_motion::{ClipCue, IntentOutcome, PathFollower, PathRef};
use tracing::debug;

use crate::binding::TargetResolver;
use crate::clips::ClipLibrary;
use crate::error::DispatchError;
use crate::ids::{ContextId, FollowerId, TrackId};
use crate::markers::{PathCommand, PathCommandMarker};

#[derive(Debug, Default, Clone)]
pub struct PathCommandReceiver {
    /// Explicit follower; the track binding is used when unset.
    follower: Option<FollowerId>,
    /// Paths addressed by `NewSpline` markers.
    paths: Vec<PathRef>,
}

impl PathCommandReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_follower(mut self, follower: FollowerId) -> Self {
        self.follower = Some(follower);
        self
    }

    pub fn with_paths(mut self, paths: Vec<PathRef>) -> Self {
        self.paths = paths;
        self
    }

    pub fn push_path(&mut self, path: PathRef) -> usize {
        self.paths.push(path);
        self.paths.len() - 1
    }

    pub fn paths(&self) -> &[PathRef] {
        &self.paths
    }

    pub fn resolve_follower(
        &self,
        context: ContextId,
        track: TrackId,
        resolver: &dyn TargetResolver,
    ) -> Option<FollowerId> {
        self.follower
            .or_else(|| resolver.track_follower(context, track))
    }

    fn cue(
        &self,
        marker: &PathCommandMarker,
        clips: &ClipLibrary,
    ) -> Result<Option<ClipCue>, DispatchError> {
        match &marker.clip {
            None => Ok(None),
            Some(key) => clips
                .get(key)
                .map(|clip| Some(ClipCue::new(clip, marker.return_to_base)))
                .ok_or_else(|| DispatchError::UnknownClip { key: key.clone() }),
        }
    }

    /// Apply `marker` to `follower`.
    ///
    /// The motion part is always applied first. A clip that cannot be found, or a
    /// contradictory resume, is reported after the follower has changed and no
    /// injection is requested.
    pub fn apply(
        &self,
        follower_id: FollowerId,
        marker: &PathCommandMarker,
        follower: &mut PathFollower,
        injector: Option<&mut dyn AnimInjection>,
        clips: &ClipLibrary,
    ) -> Result<Option<IntentOutcome>, DispatchError> {
        debug!(
            follower = follower_id.0,
            command = ?marker.command,
            value = marker.value,
            "dispatch: path command"
        );
        let intent = match marker.command {
            PathCommand::Pause => match self.cue(marker, clips) {
                Ok(cue) => follower.pause_with(cue),
                Err(err) => {
                    follower.pause();
                    return Err(err);
                }
            },
            PathCommand::Stop => match self.cue(marker, clips) {
                Ok(cue) => follower.stop_with(cue),
                Err(err) => {
                    follower.stop();
                    return Err(err);
                }
            },
            PathCommand::Resume => match self.cue(marker, clips) {
                Ok(cue) => follower.resume_with(cue, marker.stop_injection)?,
                Err(err) => {
                    follower.resume();
                    return Err(err);
                }
            },
            PathCommand::Unstop => {
                follower.unstop();
                None
            }
            PathCommand::SetSpeedMultiplier => {
                follower.set_speed_multiplier(marker.value);
                None
            }
            PathCommand::WarpToT => {
                follower.warp_to_normalized_t(marker.value);
                None
            }
            PathCommand::SetT => {
                follower.set_normalized_t(marker.value);
                None
            }
            PathCommand::NewSpline => {
                let path = self.paths.get(marker.path_index).ok_or(
                    DispatchError::PathIndexOutOfRange {
                        index: marker.path_index,
                        count: self.paths.len(),
                    },
                )?;
                follower.hot_swap_path(path.clone(), marker.value);
                None
            }
        };

        let Some(intent) = intent else {
            return Ok(None);
        };
        let injector = injector.ok_or(DispatchError::MissingInjector(follower_id))?;
        Ok(Some(intent.apply(injector)?))
    }
}
