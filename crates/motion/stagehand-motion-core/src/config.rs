use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowMode {
    /// An external driver (timeline track, gameplay) pushes `t`.
    #[default]
    Driven,
    /// The follower advances `t` itself every update.
    FreeRun,
}

/// Follower settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerConfig {
    pub mode: FollowMode,
    /// Base free-run speed in normalized units per second.
    pub normalized_speed_per_second: f32,
    /// Initial speed multiplier.
    pub speed_multiplier: f32,
    /// Add a ping-pong oscillation of the follower clock to the multiplier.
    pub ping_pong_speed: bool,
    pub ping_pong_amplitude: f32,
    pub orient_to_tangent: bool,
    /// Keep the facing horizontal by projecting the tangent onto the up plane.
    pub yaw_only: bool,
    /// Up reference in path-local space.
    pub up: Vector3<f32>,
    /// Wrap back to 0 on reaching the end in free-run.
    pub loop_path: bool,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            mode: FollowMode::Driven,
            normalized_speed_per_second: 0.2,
            speed_multiplier: 1.0,
            ping_pong_speed: false,
            ping_pong_amplitude: 0.02,
            orient_to_tangent: true,
            yaw_only: false,
            up: Vector3::y(),
            loop_path: false,
        }
    }
}
