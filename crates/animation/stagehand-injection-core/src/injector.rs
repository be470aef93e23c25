//! Injector: serializes override requests onto a blend graph's override input.
//!
//! Phases run `Idle → FadingIn → Holding → FadingOut → Idle`, advanced only by
//! `update(dt)`. Waiting is "return without advancing the phase". A request that
//! arrives while a session is live aborts that session with a short hand-off fade
//! and waits in the pending slot until the active slot drains to `Idle`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clip::wrap_time;
use crate::config::InjectorConfig;
use crate::error::InjectionError;
use crate::fade::{Fade, FadeStep};
use crate::graph::{BlendGraph, MaskRef};
use crate::ids::{IdAllocator, SessionId};
use crate::outputs::{InjectionEvent, InjectionOutputs};
use crate::request::{OverrideRequest, PlayClip};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    FadingIn,
    Holding,
    FadingOut,
}

/// What a play call did with a valid request.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayOutcome {
    /// Connected immediately; the injector was idle.
    Started(SessionId),
    /// Waiting for the active session to fade out.
    Queued(SessionId),
}

impl PlayOutcome {
    pub fn session(&self) -> SessionId {
        match self {
            PlayOutcome::Started(id) | PlayOutcome::Queued(id) => *id,
        }
    }
}

/// The injection contract path commands call into.
pub trait AnimInjection {
    fn play_clip(&mut self, args: PlayClip) -> Result<PlayOutcome, InjectionError>;

    /// Request a smooth stop of the live session. `None` uses the configured
    /// stop fade. Returns false when nothing was injecting.
    fn stop_active_injection(&mut self, fade_out: Option<f32>) -> bool;
}

/// How the Holding phase ends.
#[derive(Clone, Copy, Debug, PartialEq)]
enum HoldMode {
    /// Hold until `duration` has elapsed on the session clock.
    UntilClipEnd { duration: f32 },
    /// Authored looping clip; the source wraps itself.
    UntilAbort,
    /// Non-looping clip held indefinitely: the source clock is frozen and its
    /// time is wrapped here every tick.
    ManualLoop { length: f32, speed: f32 },
}

#[derive(Debug)]
struct Session {
    id: SessionId,
    request: OverrideRequest,
    phase: Phase,
    weight: f32,
    fade: Fade,
    hold: HoldMode,
    /// Time since the source was connected.
    elapsed: f32,
    playback_time: f32,
    abort: Option<Option<f32>>,
}

enum Tick {
    Running,
    /// Reached Idle; `leftover` is the part of the slice past completion.
    Finished { leftover: f32 },
}

impl Session {
    fn set_weight(&mut self, graph: &mut BlendGraph, weight: f32) {
        self.weight = weight;
        graph.set_weight(weight);
        trace!(session = self.id.0, weight, "injector: weight");
    }

    /// Flag the session for abort; observed at the next tick boundary.
    ///
    /// A session already fading out only switches to the new duration when that
    /// finishes sooner than the running fade.
    fn request_abort(&mut self, fade_out: Option<f32>) {
        if self.phase == Phase::FadingOut {
            if let Some(d) = fade_out {
                if d < self.fade.remaining() {
                    self.fade = Fade::new(self.weight, 0.0, d);
                }
            }
            return;
        }
        self.abort = Some(fade_out);
    }

    fn begin_fade_out(&mut self, duration: f32, aborted: bool, events: &mut Vec<InjectionEvent>) {
        debug!(
            session = self.id.0,
            clip = self.request.clip_name(),
            duration,
            aborted,
            "injector: fading out"
        );
        events.push(InjectionEvent::HoldComplete {
            session: self.id,
            aborted,
        });
        self.fade = Fade::new(self.weight, 0.0, duration);
        self.phase = Phase::FadingOut;
    }

    fn tick(&mut self, dt: f32, graph: &mut BlendGraph, events: &mut Vec<InjectionEvent>) -> Tick {
        graph.evaluate(dt);
        self.elapsed += dt;
        match self.hold {
            HoldMode::ManualLoop { length, speed } => {
                self.playback_time = wrap_time(self.playback_time + dt * speed, length);
                if let Some(source) = graph.source_mut() {
                    source.set_time(self.playback_time);
                }
            }
            HoldMode::UntilClipEnd { .. } | HoldMode::UntilAbort => {
                if let Some(source) = graph.source() {
                    self.playback_time = source.time();
                }
            }
        }

        let mut budget = dt;
        loop {
            match self.phase {
                Phase::Idle => return Tick::Finished { leftover: budget },
                Phase::FadingIn => {
                    if let Some(abort) = self.abort {
                        let duration = abort.unwrap_or(self.request.fade_out());
                        self.begin_fade_out(duration, true, events);
                        continue;
                    }
                    match self.fade.advance(budget) {
                        FadeStep::Running(w) => {
                            self.set_weight(graph, w);
                            return Tick::Running;
                        }
                        FadeStep::Finished { weight, leftover } => {
                            self.set_weight(graph, weight);
                            self.phase = Phase::Holding;
                            events.push(InjectionEvent::FadeInComplete { session: self.id });
                            budget = leftover;
                        }
                    }
                }
                Phase::Holding => {
                    if let Some(abort) = self.abort {
                        let duration = abort.unwrap_or(self.request.fade_out());
                        self.begin_fade_out(duration, true, events);
                        continue;
                    }
                    match self.hold {
                        HoldMode::UntilClipEnd { duration } => {
                            let over = self.elapsed - duration;
                            if over < 0.0 {
                                return Tick::Running;
                            }
                            budget = budget.min(over);
                            let fade_out = self.request.fade_out();
                            self.begin_fade_out(fade_out, false, events);
                        }
                        HoldMode::UntilAbort | HoldMode::ManualLoop { .. } => {
                            return Tick::Running;
                        }
                    }
                }
                Phase::FadingOut => match self.fade.advance(budget) {
                    FadeStep::Running(w) => {
                        self.set_weight(graph, w);
                        return Tick::Running;
                    }
                    FadeStep::Finished { leftover, .. } => {
                        self.set_weight(graph, 0.0);
                        self.phase = Phase::Idle;
                        return Tick::Finished { leftover };
                    }
                },
            }
        }
    }
}

/// Disconnect and destroy the session's source; the override input ends at weight 0.
fn retire(session: Session, graph: &mut BlendGraph, events: &mut Vec<InjectionEvent>) {
    let clip = session.request.clip_name().to_string();
    graph.set_weight(0.0);
    if graph.disconnect().is_some() {
        events.push(InjectionEvent::Disconnected {
            session: session.id,
            clip: clip.clone(),
        });
    }
    debug!(session = session.id.0, clip = %clip, "injector: session complete");
    events.push(InjectionEvent::Completed {
        session: session.id,
        clip,
    });
}

#[derive(Debug)]
pub struct Injector {
    cfg: InjectorConfig,
    default_mask: Option<MaskRef>,
    /// Created on the first request.
    graph: Option<BlendGraph>,
    ids: IdAllocator,
    active: Option<Session>,
    pending: Option<(SessionId, OverrideRequest)>,
    /// Events raised between ticks; flushed into the next tick's outputs.
    queued_events: Vec<InjectionEvent>,
    outputs: InjectionOutputs,
}

impl Default for Injector {
    fn default() -> Self {
        Self::new(InjectorConfig::default())
    }
}

impl Injector {
    pub fn new(cfg: InjectorConfig) -> Self {
        let default_mask = cfg.default_mask.clone().map(Arc::new);
        Self {
            cfg,
            default_mask,
            graph: None,
            ids: IdAllocator::new(),
            active: None,
            pending: None,
            queued_events: Vec::new(),
            outputs: InjectionOutputs::default(),
        }
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.cfg
    }

    /// The blend graph, once a request has created it.
    pub fn graph(&self) -> Option<&BlendGraph> {
        self.graph.as_ref()
    }

    fn graph_is_valid(&self) -> bool {
        self.graph.as_ref().is_some_and(BlendGraph::is_valid)
    }

    fn ensure_graph(&mut self) -> &mut BlendGraph {
        if !self.graph_is_valid() {
            debug!("injector: creating blend graph");
            self.graph = Some(BlendGraph::new());
        }
        self.graph.get_or_insert_with(BlendGraph::new)
    }

    pub fn phase(&self) -> Phase {
        self.active.as_ref().map_or(Phase::Idle, |s| s.phase)
    }

    pub fn is_injecting(&self) -> bool {
        self.active.is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Override weight currently applied to the graph.
    pub fn weight(&self) -> f32 {
        self.graph.as_ref().map_or(0.0, BlendGraph::override_weight)
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active.as_ref().map(|s| s.id)
    }

    pub fn active_clip(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.request.clip_name())
    }

    /// Local time of the active clip.
    pub fn playback_time(&self) -> Option<f32> {
        self.active.as_ref().map(|s| s.playback_time)
    }

    pub fn abort_requested(&self) -> bool {
        self.active.as_ref().is_some_and(|s| s.abort.is_some())
    }

    fn report(&mut self, err: &InjectionError) {
        let diagnostic = err.to_diagnostic();
        diagnostic.log();
        self.queued_events
            .push(InjectionEvent::Diagnostic(diagnostic));
    }

    /// Request an override clip.
    ///
    /// Invalid requests are reported and change nothing. When a session is live the
    /// request is queued behind a hand-off abort; a previously queued request that
    /// never started is superseded.
    pub fn play_clip(&mut self, args: PlayClip) -> Result<PlayOutcome, InjectionError> {
        let request = match OverrideRequest::resolve(args, &self.cfg, self.default_mask.as_ref())
        {
            Ok(request) => request,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };
        self.ensure_graph();
        let id = self.ids.alloc_session();

        if let Some(active) = self.active.as_mut() {
            let handoff = self.cfg.handoff_fade_out;
            active.request_abort(Some(handoff));
            debug!(
                active = active.id.0,
                queued = id.0,
                clip = request.clip_name(),
                "injector: hand-off requested"
            );
            self.queued_events.push(InjectionEvent::AbortRequested {
                session: active.id,
                fade_out: Some(handoff),
            });
            let clip = request.clip_name().to_string();
            if let Some((old, old_request)) = self.pending.replace((id, request)) {
                self.queued_events.push(InjectionEvent::Superseded {
                    session: old,
                    clip: old_request.clip_name().to_string(),
                });
            }
            self.queued_events
                .push(InjectionEvent::Queued { session: id, clip });
            return Ok(PlayOutcome::Queued(id));
        }

        let mut events = std::mem::take(&mut self.queued_events);
        self.begin(id, request, &mut events);
        self.queued_events = events;
        Ok(PlayOutcome::Started(id))
    }

    /// Request a smooth stop of the live session.
    pub fn stop_active_injection(&mut self, fade_out: Option<f32>) -> bool {
        if !self.graph_is_valid() {
            return false;
        }
        let fade = fade_out.unwrap_or(self.cfg.stop_fade_out).max(0.0);
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        active.request_abort(Some(fade));
        debug!(session = active.id.0, fade, "injector: stop requested");
        self.queued_events.push(InjectionEvent::AbortRequested {
            session: active.id,
            fade_out: Some(fade),
        });
        true
    }

    /// Destroy the graph and drop any live or queued session without fading.
    pub fn teardown(&mut self) {
        if let Some(graph) = self.graph.as_mut() {
            graph.teardown();
        }
        if self.active.take().is_some() || self.pending.take().is_some() {
            debug!("injector: teardown dropped in-flight sessions");
        }
    }

    fn begin(&mut self, id: SessionId, request: OverrideRequest, events: &mut Vec<InjectionEvent>) {
        let min_speed = self.cfg.min_speed;
        let graph = self.ensure_graph();

        let clip = request.clip().clone();
        let mut source = clip.instantiate();
        source.set_speed(request.speed());
        source.set_time(0.0);

        let hold = if request.return_to_base() {
            HoldMode::UntilClipEnd {
                duration: request.clip_duration(min_speed),
            }
        } else if clip.is_looping() {
            HoldMode::UntilAbort
        } else {
            source.set_speed(0.0);
            HoldMode::ManualLoop {
                length: clip.length().max(min_speed),
                speed: request.speed(),
            }
        };

        graph.connect(source);
        graph.set_weight(0.0);
        graph.set_mask(request.mask().cloned());
        graph.set_additive(request.additive());

        let name = clip.name().to_string();
        debug!(session = id.0, clip = %name, ?hold, "injector: session started");
        events.push(InjectionEvent::Connected {
            session: id,
            clip: name.clone(),
        });
        events.push(InjectionEvent::Started {
            session: id,
            clip: name,
        });

        let mut session = Session {
            id,
            phase: Phase::FadingIn,
            weight: 0.0,
            fade: Fade::new(0.0, request.target_weight(), request.fade_in()),
            hold,
            elapsed: 0.0,
            playback_time: 0.0,
            abort: None,
            request,
        };
        if session.fade.is_instant() {
            let target = session.request.target_weight();
            session.set_weight(graph, target);
            session.phase = Phase::Holding;
            events.push(InjectionEvent::FadeInComplete { session: id });
        }
        self.active = Some(session);
    }

    /// Advance the live session by `dt` seconds and report the layer state.
    pub fn update(&mut self, dt: f32) -> &InjectionOutputs {
        self.outputs.clear();
        let mut events = std::mem::take(&mut self.queued_events);
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if !self.graph_is_valid() {
            if self.active.take().is_some() || self.pending.take().is_some() {
                debug!("injector: graph torn down; treating as idle");
            }
        } else {
            // A session that drains mid-tick hands its slot to the queued request,
            // which starts at weight 0 and runs for the rest of the slice.
            let mut slice = Some(dt);
            while let Some(budget) = slice.take() {
                if let (Some(session), Some(graph)) = (self.active.as_mut(), self.graph.as_mut()) {
                    if let Tick::Finished { leftover } = session.tick(budget, graph, &mut events) {
                        if let Some(done) = self.active.take() {
                            retire(done, graph, &mut events);
                        }
                        slice = Some(leftover);
                    }
                }
                if self.active.is_some() {
                    break;
                }
                match self.pending.take() {
                    Some((id, request)) => self.begin(id, request, &mut events),
                    None => break,
                }
            }
        }

        self.outputs.phase = self.phase();
        self.outputs.weight = self.weight();
        self.outputs.session = self.active_session();
        self.outputs.layer = self
            .graph
            .as_ref()
            .map(BlendGraph::sample)
            .unwrap_or_default();
        self.outputs.events = events;
        &self.outputs
    }
}

impl AnimInjection for Injector {
    fn play_clip(&mut self, args: PlayClip) -> Result<PlayOutcome, InjectionError> {
        Injector::play_clip(self, args)
    }

    fn stop_active_injection(&mut self, fade_out: Option<f32>) -> bool {
        Injector::stop_active_injection(self, fade_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipData;

    fn injector() -> Injector {
        Injector::new(InjectorConfig::default())
    }

    #[test]
    fn instant_fade_in_goes_straight_to_holding() {
        let mut inj = injector();
        let clip = ClipData::new("nod", 1.0).into_ref();
        inj.play_clip(PlayClip::new(clip).fade_in(0.0).target_weight(0.6))
            .expect("valid");
        assert_eq!(inj.phase(), Phase::Holding);
        assert_eq!(inj.weight(), 0.6);
    }

    #[test]
    fn abort_during_fade_out_only_shortens() {
        let mut inj = injector();
        let clip = ClipData::new("nod", 0.1).into_ref();
        inj.play_clip(PlayClip::new(clip).fade_in(0.0).fade_out(1.0))
            .expect("valid");
        inj.update(0.125);
        assert_eq!(inj.phase(), Phase::FadingOut);
        inj.stop_active_injection(Some(5.0));
        inj.update(0.5);
        assert_eq!(inj.phase(), Phase::FadingOut);
        inj.stop_active_injection(Some(0.0));
        inj.update(0.0);
        assert_eq!(inj.phase(), Phase::Idle);
    }

    #[test]
    fn stop_without_session_is_noop() {
        let mut inj = injector();
        assert!(!inj.stop_active_injection(None));
        inj.update(0.1);
        assert_eq!(inj.phase(), Phase::Idle);
    }
}
