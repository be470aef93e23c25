//! Stagehand Injection Core (engine-agnostic)
//!
//! Temporarily overrides a subject's base animation with a clip played on the
//! override input of a two-layer blend graph, fading it in, holding it and fading
//! it back out. At most one session is live per injector; a newer request drains
//! the live one with a short hand-off fade before it connects.
//!
//! The host engine supplies clips through [`ClipAsset`]/[`ClipSource`] and reads the
//! resulting [`LayerSample`] each frame.

pub mod clip;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fade;
pub mod graph;
pub mod ids;
pub mod injector;
pub mod outputs;
pub mod request;

// Re-exports for consumers (motion/timeline cores, hosts)
pub use clip::{wrap_time, ClipAsset, ClipData, ClipPlayback, ClipRef, ClipSource};
pub use config::InjectorConfig;
pub use diagnostics::{Diagnostic, DiagnosticCategory, Severity};
pub use error::InjectionError;
pub use graph::{BlendGraph, LayerMask, LayerSample, MaskRef, BASE_WEIGHT};
pub use ids::{IdAllocator, SessionId, SubjectId};
pub use injector::{AnimInjection, Injector, Phase, PlayOutcome};
pub use outputs::{InjectionEvent, InjectionOutputs};
pub use request::{OverrideRequest, PlayClip};
