//! Stagehand Timeline Core (engine-agnostic)
//!
//! Time-stamped markers drive followers and injectors. Path-command markers are
//! applied live one notification at a time. Activation markers apply live while
//! playing and are rebuilt deterministically from history when the playhead is
//! scrubbed, jumps backward or is sought. A [`Stage`] owns one playback context
//! and steps dispatch, followers and injectors in that order.

pub mod activation;
pub mod binding;
pub mod clips;
pub mod config;
pub mod error;
pub mod frame;
pub mod ids;
pub mod markers;
pub mod path_receiver;
pub mod scrub;
pub mod sequencer;
pub mod stage;
pub mod timeline;

pub use activation::{
    ActivationChange, ActivationReceiver, ActivationSink, ActivationStates, PlayState,
};
pub use binding::{resolve_activation_target, Bindings, TargetResolver};
pub use clips::ClipLibrary;
pub use config::{ActivationConfig, ScrubConfig, StageConfig};
pub use error::DispatchError;
pub use frame::{DispatchedCommand, FollowerPose, LayerWeight, StageEvent, StageFrame};
pub use ids::{ContextId, FollowerId, TargetId, TrackId};
pub use markers::{ActivationCommand, ActivationMarker, PathCommand, PathCommandMarker};
pub use path_receiver::PathCommandReceiver;
pub use scrub::{ScrubDriver, TimeQuery, TimeSample};
pub use sequencer::{Advance, MarkerSequencer};
pub use stage::Stage;
pub use timeline::{
    ActivationTrack, MarkerAddress, MarkerView, PathCommandTrack, Timeline, Track,
};
