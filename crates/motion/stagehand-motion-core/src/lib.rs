//! Stagehand Motion Core (engine-agnostic)
//!
//! A [`PathFollower`] keeps a normalized parameter `t` on a [`Path`], moves and
//! orients its target from it, and answers pause/stop/resume/teleport/speed
//! commands. Commands that carry a clip return an [`InjectionIntent`] for the
//! subject's injector instead of touching it directly.

pub mod config;
pub mod error;
pub mod follower;
pub mod intent;
pub mod path;

pub use config::{FollowMode, FollowerConfig};
pub use error::MotionError;
pub use follower::{PathFollower, PathState, Pose};
pub use intent::{ClipCue, InjectionIntent, IntentOutcome};
pub use path::{Path, PathRef, PathSample, PolylinePath};
