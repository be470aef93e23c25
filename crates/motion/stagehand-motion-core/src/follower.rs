//! Path follower: owns a normalized path parameter and poses a target along the path.
//!
//! In `Driven` mode `t` only changes through commands; in `FreeRun` mode `update(dt)`
//! also advances it. Every update re-evaluates the pose from the current `t`.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{FollowMode, FollowerConfig};
use crate::error::MotionError;
use crate::intent::{ClipCue, InjectionIntent};
use crate::path::PathRef;

const MIN_TANGENT_SQ: f32 = 1e-6;
const MIN_YAW_SQ: f32 = 1e-6;

fn fmod(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        return 0.0;
    }
    let m = a % b;
    if (m < 0.0 && b > 0.0) || (m > 0.0 && b < 0.0) {
        m + b
    } else {
        m
    }
}

/// Reflect t into [0, span], bouncing with period 2 * span.
fn ping_pong(t: f32, span: f32) -> f32 {
    if span <= 0.0 {
        return 0.0;
    }
    let m = fmod(t, 2.0 * span);
    if m <= span {
        m
    } else {
        2.0 * span - m
    }
}

#[inline]
fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// World-space transform written to the followed target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }
}

impl Pose {
    /// Local +Z in world space.
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * Vector3::z()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathState {
    /// Always within [0,1].
    pub t: f32,
    pub paused: bool,
    pub stopped: bool,
    /// Always >= 0.
    pub speed_multiplier: f32,
    pub loop_path: bool,
    pub orient_to_tangent: bool,
    pub yaw_only: bool,
    /// Unit forward from the last yaw projection that was long enough to normalize.
    /// Starts as local +Z.
    pub last_valid_yaw_forward: Option<Vector3<f32>>,
}

impl PathState {
    fn from_config(cfg: &FollowerConfig) -> Self {
        Self {
            t: 0.0,
            paused: false,
            stopped: false,
            speed_multiplier: sanitize_multiplier(cfg.speed_multiplier),
            loop_path: cfg.loop_path,
            orient_to_tangent: cfg.orient_to_tangent,
            yaw_only: cfg.yaw_only,
            last_valid_yaw_forward: Some(Vector3::z()),
        }
    }

    #[inline]
    pub fn gated(&self) -> bool {
        self.paused || self.stopped
    }
}

fn sanitize_multiplier(m: f32) -> f32 {
    if m.is_nan() {
        0.0
    } else {
        m.max(0.0)
    }
}

#[derive(Debug)]
pub struct PathFollower {
    cfg: FollowerConfig,
    path: Option<PathRef>,
    target: Option<Pose>,
    state: PathState,
    /// Follower's own clock, drives the ping-pong oscillation.
    clock: f32,
    force_preview_ignore_gates: bool,
}

impl PathFollower {
    /// A follower with an attached target at the origin and no path.
    pub fn new(cfg: FollowerConfig) -> Self {
        let state = PathState::from_config(&cfg);
        Self {
            cfg,
            path: None,
            target: Some(Pose::default()),
            state,
            clock: 0.0,
            force_preview_ignore_gates: false,
        }
    }

    pub fn with_path(mut self, path: PathRef) -> Self {
        self.path = Some(path);
        self
    }

    pub fn config(&self) -> &FollowerConfig {
        &self.cfg
    }

    pub fn state(&self) -> &PathState {
        &self.state
    }

    pub fn t(&self) -> f32 {
        self.state.t
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped
    }

    pub fn path(&self) -> Option<&PathRef> {
        self.path.as_ref()
    }

    pub fn set_path(&mut self, path: Option<PathRef>) {
        self.path = path;
    }

    pub fn target(&self) -> Option<&Pose> {
        self.target.as_ref()
    }

    pub fn attach_target(&mut self, pose: Pose) {
        self.target = Some(pose);
    }

    pub fn detach_target(&mut self) -> Option<Pose> {
        self.target.take()
    }

    /// Editor preview: let `set_normalized_t` through even while paused or stopped.
    pub fn set_force_preview_ignore_gates(&mut self, force: bool) {
        self.force_preview_ignore_gates = force;
    }

    /// Set `t` from a driver. Ignored while paused or stopped unless preview gates are
    /// forced open. Returns whether `t` was applied.
    pub fn set_normalized_t(&mut self, value: f32) -> bool {
        if self.state.gated() && !self.force_preview_ignore_gates {
            trace!(value, "follower: set_t gated");
            return false;
        }
        if !value.is_finite() {
            return false;
        }
        self.state.t = clamp01(value);
        let _ = self.evaluate();
        true
    }

    /// Teleport to `value`, bypassing pause and stop.
    pub fn warp_to_normalized_t(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        self.state.t = clamp01(value);
        debug!(t = self.state.t, "follower: warp");
        let _ = self.evaluate();
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.state.speed_multiplier = sanitize_multiplier(multiplier);
    }

    pub fn pause(&mut self) {
        self.state.paused = true;
    }

    pub fn resume(&mut self) {
        self.state.paused = false;
    }

    pub fn stop(&mut self) {
        self.state.stopped = true;
    }

    pub fn unstop(&mut self) {
        self.state.stopped = false;
    }

    /// Pause and optionally request a clip.
    pub fn pause_with(&mut self, cue: Option<ClipCue>) -> Option<InjectionIntent> {
        self.pause();
        cue.map(InjectionIntent::Play)
    }

    /// Stop and optionally request a clip.
    pub fn stop_with(&mut self, cue: Option<ClipCue>) -> Option<InjectionIntent> {
        self.stop();
        cue.map(InjectionIntent::Play)
    }

    /// Resume, then either request a clip or a stop of the active injection.
    ///
    /// Asking for both is refused after the resume has been applied.
    pub fn resume_with(
        &mut self,
        cue: Option<ClipCue>,
        stop_injection: bool,
    ) -> Result<Option<InjectionIntent>, MotionError> {
        self.resume();
        match (cue, stop_injection) {
            (Some(cue), true) => Err(MotionError::ContradictoryInjection {
                clip: cue.clip.name().to_string(),
            }),
            (Some(cue), false) => Ok(Some(InjectionIntent::Play(cue))),
            (None, true) => Ok(Some(InjectionIntent::Stop)),
            (None, false) => Ok(None),
        }
    }

    /// Replace the path atomically and re-pose at `start_t`. Always ends unpaused.
    pub fn hot_swap_path(&mut self, path: PathRef, start_t: f32) {
        self.state.paused = true;
        self.path = Some(path);
        self.state.t = if start_t.is_finite() {
            clamp01(start_t)
        } else {
            self.state.t
        };
        let _ = self.evaluate();
        self.state.paused = false;
        debug!(t = self.state.t, "follower: path swapped");
    }

    /// Advance free-run time and re-pose the target.
    pub fn update(&mut self, dt: f32) -> Option<&Pose> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock += dt;
        if self.cfg.mode == FollowMode::FreeRun && !self.state.gated() && self.path.is_some() {
            let oscillation = if self.cfg.ping_pong_speed {
                ping_pong(self.clock, self.cfg.ping_pong_amplitude)
            } else {
                0.0
            };
            let rate = self.cfg.normalized_speed_per_second
                * (self.state.speed_multiplier + oscillation);
            let mut t = clamp01(self.state.t + rate * dt);
            if t >= 1.0 && self.state.loop_path {
                t = 0.0;
            }
            self.state.t = t;
        }
        match self.evaluate() {
            Ok(pose) => Some(pose),
            Err(err) => {
                trace!(%err, "follower: evaluation skipped");
                None
            }
        }
    }

    /// Pose the target from the current `t`. A missing path, target or sample keeps the
    /// previous pose.
    pub fn evaluate(&mut self) -> Result<&Pose, MotionError> {
        let path = self.path.as_ref().ok_or(MotionError::MissingPath)?;
        let target = self.target.as_mut().ok_or(MotionError::MissingTarget)?;
        let Some(sample) = path.evaluate(self.state.t) else {
            return Ok(target);
        };

        let transform = path.transform();
        target.position = transform.transform_point(&sample.position);

        if self.state.orient_to_tangent {
            let tangent = transform.transform_vector(&sample.tangent);
            if tangent.norm_squared() > MIN_TANGENT_SQ {
                let up = transform.isometry.rotation * self.cfg.up;
                let forward = if self.state.yaw_only {
                    yaw_forward(&tangent, &up, &mut self.state.last_valid_yaw_forward)
                } else {
                    Some(tangent)
                };
                if let Some(rotation) = forward.and_then(|f| look_rotation(&f, &up)) {
                    target.rotation = rotation;
                }
            }
        }
        Ok(target)
    }
}

/// Project `tangent` onto the plane normal to `up`. A negligible projection falls back
/// to the cached forward; only a valid projection refreshes the cache.
fn yaw_forward(
    tangent: &Vector3<f32>,
    up: &Vector3<f32>,
    cache: &mut Option<Vector3<f32>>,
) -> Option<Vector3<f32>> {
    let up_n = up.try_normalize(f32::EPSILON)?;
    let projected = tangent - up_n * tangent.dot(&up_n);
    if projected.norm_squared() > MIN_YAW_SQ {
        let forward = projected.normalize();
        *cache = Some(forward);
        Some(forward)
    } else {
        *cache
    }
}

/// Rotation taking local +Z to `forward` with local +Y as close to `up` as possible.
fn look_rotation(forward: &Vector3<f32>, up: &Vector3<f32>) -> Option<UnitQuaternion<f32>> {
    let f = forward.try_normalize(f32::EPSILON)?;
    if f.cross(up).norm_squared() > 1e-12 {
        Some(UnitQuaternion::face_towards(&f, up))
    } else {
        // Parallel to up: no roll reference, take the shortest arc.
        UnitQuaternion::rotation_between(&Vector3::z(), &f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_pong_reflects() {
        assert!((ping_pong(0.5, 1.0) - 0.5).abs() < 1e-6);
        assert!((ping_pong(1.5, 1.0) - 0.5).abs() < 1e-6);
        assert!((ping_pong(2.25, 1.0) - 0.25).abs() < 1e-6);
        assert_eq!(ping_pong(3.0, 0.0), 0.0);
    }

    #[test]
    fn yaw_cache_only_updates_from_valid_projection() {
        let up = Vector3::y();
        let mut cache = None;
        assert_eq!(yaw_forward(&Vector3::y(), &up, &mut cache), None);
        let f = yaw_forward(&Vector3::new(2.0, 1.0, 0.0), &up, &mut cache);
        assert_eq!(f, Some(Vector3::x()));
        assert_eq!(yaw_forward(&Vector3::y(), &up, &mut cache), Some(Vector3::x()));
        assert_eq!(cache, Some(Vector3::x()));
    }

    #[test]
    fn look_rotation_points_z_along_forward() {
        let r = look_rotation(&Vector3::x(), &Vector3::y()).expect("rotation");
        assert!((r * Vector3::z() - Vector3::x()).norm() < 1e-5);
        let r = look_rotation(&Vector3::y(), &Vector3::y()).expect("fallback");
        assert!((r * Vector3::z() - Vector3::y()).norm() < 1e-5);
    }
}
