//! Stage: owns one playback context's timeline, followers, injectors and receivers,
//! and steps them in a fixed order.
//!
//! Each `step(dt)`:
//!   1. dispatch: while playing, fire markers crossed this step (or rebuild after a
//!      backward jump/seek); while evaluating, let the scrub driver rebuild on change
//!   2. followers: advance and pose every follower
//!   3. injectors: advance every subject's injector
//!
//! and returns a [`StageFrame`].

use indexmap::IndexMap;
use stagehand_injection::{AnimInjection, IdAllocator, Injector, SubjectId};
use stagehand_motion::{IntentOutcome, PathFollower};
use tracing::{debug, trace};

use crate::activation::{ActivationReceiver, ActivationStates, PlayState};
use crate::binding::Bindings;
use crate::clips::ClipLibrary;
use crate::config::StageConfig;
use crate::error::DispatchError;
use crate::frame::{DispatchedCommand, FollowerPose, LayerWeight, StageEvent, StageFrame};
use crate::ids::{ContextId, FollowerId, TrackId};
use crate::markers::PathCommandMarker;
use crate::path_receiver::PathCommandReceiver;
use crate::scrub::{ScrubDriver, TimeQuery, TimeSample};
use crate::sequencer::{Advance, MarkerSequencer};
use crate::timeline::{MarkerAddress, MarkerView, Timeline};

#[derive(Debug)]
struct FollowerSlot {
    follower: PathFollower,
    /// Subject whose injector receives the follower's clip requests.
    subject: Option<SubjectId>,
}

fn report(frame: &mut StageFrame, err: &DispatchError) {
    let diagnostic = err.to_diagnostic();
    diagnostic.log();
    frame.events.push(StageEvent::Diagnostic(diagnostic));
}

#[allow(clippy::too_many_arguments)]
fn dispatch_path(
    context: ContextId,
    track: TrackId,
    marker: &PathCommandMarker,
    receiver: &PathCommandReceiver,
    bindings: &Bindings,
    followers: &mut IndexMap<FollowerId, FollowerSlot>,
    injectors: &mut IndexMap<SubjectId, Injector>,
    clips: &ClipLibrary,
) -> Result<Option<IntentOutcome>, DispatchError> {
    let id = receiver
        .resolve_follower(context, track, bindings)
        .ok_or(DispatchError::TargetUnresolved {
            track,
            time: marker.time,
        })?;
    let slot = followers
        .get_mut(&id)
        .ok_or(DispatchError::UnknownFollower(id))?;
    let injector = slot
        .subject
        .and_then(|s| injectors.get_mut(&s))
        .map(|i| i as &mut dyn AnimInjection);
    receiver.apply(id, marker, &mut slot.follower, injector, clips)
}

#[derive(Debug)]
pub struct Stage {
    cfg: StageConfig,
    context: ContextId,
    timeline: Timeline,
    epoch: u64,
    time: f32,
    state: PlayState,
    seek_pending: bool,
    sequencer: MarkerSequencer,
    scrub: ScrubDriver,
    bindings: Bindings,
    clips: ClipLibrary,
    ids: IdAllocator,
    next_follower: u32,
    followers: IndexMap<FollowerId, FollowerSlot>,
    injectors: IndexMap<SubjectId, Injector>,
    activation: ActivationStates,
    receivers: Vec<ActivationReceiver>,
    path_receivers: IndexMap<TrackId, PathCommandReceiver>,
}

impl Stage {
    /// A stage evaluating `timeline` at time 0, with one activation receiver bound to
    /// `context`.
    pub fn new(cfg: StageConfig, context: ContextId, timeline: Timeline) -> Self {
        let receiver = ActivationReceiver::new(cfg.activation.clone(), Some(context));
        let scrub = ScrubDriver::new(&cfg.scrub);
        Self {
            cfg,
            context,
            timeline,
            epoch: 0,
            time: 0.0,
            state: PlayState::Evaluating,
            seek_pending: false,
            sequencer: MarkerSequencer::new(),
            scrub,
            bindings: Bindings::new(),
            clips: ClipLibrary::new(),
            ids: IdAllocator::new(),
            next_follower: 0,
            followers: IndexMap::new(),
            injectors: IndexMap::new(),
            activation: ActivationStates::new(),
            receivers: vec![receiver],
            path_receivers: IndexMap::new(),
        }
    }

    pub fn config(&self) -> &StageConfig {
        &self.cfg
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn play_state(&self) -> PlayState {
        self.state
    }

    pub fn play(&mut self) {
        debug!(time = self.time, "stage: play");
        self.state = PlayState::Playing;
    }

    /// Stop advancing time. The current time is taken as already evaluated, so pausing
    /// alone does not rebuild.
    pub fn pause(&mut self) {
        debug!(time = self.time, "stage: pause");
        self.state = PlayState::Evaluating;
        let sample = self.time_sample();
        let _ = self.scrub.poll(&sample);
    }

    /// Jump the playhead. Activation state is rebuilt at the new time on the next step.
    pub fn seek(&mut self, time: f32) {
        if !time.is_finite() {
            return;
        }
        self.time = time;
        match self.state {
            PlayState::Playing => self.seek_pending = true,
            PlayState::Evaluating => self.sequencer.sync(time),
        }
    }

    fn time_sample(&self) -> TimeSample {
        TimeSample {
            context: self.context,
            time: self.time,
        }
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    pub fn clips_mut(&mut self) -> &mut ClipLibrary {
        &mut self.clips
    }

    pub fn activation(&self) -> &ActivationStates {
        &self.activation
    }

    /// Seed initial active flags before the first step.
    pub fn activation_mut(&mut self) -> &mut ActivationStates {
        &mut self.activation
    }

    pub fn activation_receivers(&self) -> &[ActivationReceiver] {
        &self.receivers
    }

    /// Receivers bound to another context stay inert on this stage.
    pub fn add_activation_receiver(&mut self, receiver: ActivationReceiver) {
        self.receivers.push(receiver);
    }

    /// Create an injector for a new animated subject.
    pub fn add_subject(&mut self) -> SubjectId {
        let id = self.ids.alloc_subject();
        self.injectors
            .insert(id, Injector::new(self.cfg.injector.clone()));
        id
    }

    pub fn injector(&self, subject: SubjectId) -> Option<&Injector> {
        self.injectors.get(&subject)
    }

    pub fn injector_mut(&mut self, subject: SubjectId) -> Option<&mut Injector> {
        self.injectors.get_mut(&subject)
    }

    /// Add a follower built from the stage's follower config.
    pub fn add_follower(&mut self, subject: Option<SubjectId>) -> FollowerId {
        let follower = PathFollower::new(self.cfg.follower.clone());
        self.add_follower_with(follower, subject)
    }

    pub fn add_follower_with(
        &mut self,
        follower: PathFollower,
        subject: Option<SubjectId>,
    ) -> FollowerId {
        let id = FollowerId(self.next_follower);
        self.next_follower = self.next_follower.wrapping_add(1);
        self.followers.insert(id, FollowerSlot { follower, subject });
        id
    }

    pub fn follower(&self, id: FollowerId) -> Option<&PathFollower> {
        self.followers.get(&id).map(|s| &s.follower)
    }

    pub fn follower_mut(&mut self, id: FollowerId) -> Option<&mut PathFollower> {
        self.followers.get_mut(&id).map(|s| &mut s.follower)
    }

    /// Route a path-command track's markers through `receiver`.
    pub fn bind_path_track(&mut self, track: TrackId, receiver: PathCommandReceiver) {
        self.path_receivers.insert(track, receiver);
    }

    pub fn path_receiver_mut(&mut self, track: TrackId) -> Option<&mut PathCommandReceiver> {
        self.path_receivers.get_mut(&track)
    }

    /// Advance the stage by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> StageFrame {
        self.epoch = self.epoch.wrapping_add(1);
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let mut frame = StageFrame {
            epoch: self.epoch,
            dt,
            ..StageFrame::default()
        };

        match self.state {
            PlayState::Playing => {
                self.time += dt;
                let advance = if std::mem::take(&mut self.seek_pending) {
                    self.sequencer.seek(self.time)
                } else {
                    self.sequencer.advance(&self.timeline, self.time)
                };
                match advance {
                    Advance::Fire(addrs) => {
                        for addr in addrs {
                            self.dispatch(addr, &mut frame);
                        }
                    }
                    Advance::Rebuild(time) => self.rebuild(time, &mut frame),
                }
                // Keep the scrub driver in step so a later pause does not rebuild.
                let sample = self.time_sample();
                let _ = self.scrub.poll(&sample);
            }
            PlayState::Evaluating => {
                let sample = self.time_sample();
                if let Some((sample, changes)) = self.scrub.tick(
                    &sample,
                    &self.timeline,
                    &mut self.receivers,
                    &self.bindings,
                    &mut self.activation,
                ) {
                    frame.events.push(StageEvent::Rebuilt {
                        time: sample.time,
                        targets: changes.len(),
                    });
                    frame.activations.extend(changes);
                }
            }
        }

        for (id, slot) in self.followers.iter_mut() {
            if let Some(pose) = slot.follower.update(dt).copied() {
                frame.poses.push(FollowerPose {
                    follower: *id,
                    t: slot.follower.t(),
                    pose,
                });
            }
        }

        for (subject, injector) in self.injectors.iter_mut() {
            let out = injector.update(dt);
            frame.weights.push(LayerWeight {
                subject: *subject,
                phase: out.phase,
                weight: out.weight,
            });
            frame
                .events
                .extend(out.events.iter().cloned().map(|event| StageEvent::Injection {
                    subject: *subject,
                    event,
                }));
        }

        frame.time = self.time;
        frame
    }

    fn rebuild(&mut self, time: f32, frame: &mut StageFrame) {
        let mut changes = Vec::new();
        for receiver in self.receivers.iter_mut() {
            if receiver.context() != Some(self.context) || !receiver.config().apply_during_scrub {
                continue;
            }
            changes.extend(receiver.rebuild_to_time(
                &self.timeline,
                time,
                &self.bindings,
                &mut self.activation,
            ));
        }
        frame.events.push(StageEvent::Rebuilt {
            time,
            targets: changes.len(),
        });
        frame.activations.extend(changes);
    }

    fn dispatch(&mut self, addr: MarkerAddress, frame: &mut StageFrame) {
        let Some(view) = self.timeline.marker(addr) else {
            return;
        };
        match view {
            MarkerView::Activation { track, marker } => {
                frame.events.push(StageEvent::Dispatched {
                    track,
                    time: marker.time,
                    command: DispatchedCommand::Activation(marker.command),
                });
                // Only receivers on this stage's context; rebuild reaches the same set.
                for receiver in self.receivers.iter_mut() {
                    if receiver.context() != Some(self.context) {
                        continue;
                    }
                    match receiver.on_notify(
                        track,
                        marker,
                        PlayState::Playing,
                        &self.bindings,
                        &mut self.activation,
                    ) {
                        Ok(Some(change)) => {
                            frame.activations.push(change);
                            frame.events.push(StageEvent::Activation(change));
                        }
                        Ok(None) => {}
                        Err(err) => report(frame, &err),
                    }
                }
            }
            MarkerView::PathCommand { track, marker } => {
                frame.events.push(StageEvent::Dispatched {
                    track,
                    time: marker.time,
                    command: DispatchedCommand::Path(marker.command),
                });
                let Some(receiver) = self.path_receivers.get(&track) else {
                    trace!(track = track.0, "stage: no receiver for path track");
                    return;
                };
                let result = dispatch_path(
                    self.context,
                    track,
                    marker,
                    receiver,
                    &self.bindings,
                    &mut self.followers,
                    &mut self.injectors,
                    &self.clips,
                );
                match result {
                    // The injector already queued its own diagnostic for this frame.
                    Err(DispatchError::Injection(err)) => {
                        trace!(%err, "stage: injection refused");
                    }
                    Err(err) => report(frame, &err),
                    Ok(_) => {}
                }
            }
        }
    }
}

impl TimeQuery for Stage {
    fn sample(&self) -> Option<TimeSample> {
        Some(self.time_sample())
    }
}
