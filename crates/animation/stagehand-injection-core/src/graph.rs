//! Two-input blend graph: a `base` source fixed at weight 1.0 and a single
//! `override` slot driven by the injector.
//!
//! Every operation on a disconnected override input, or on a torn-down graph,
//! is a no-op. Cleanup can therefore run any number of times.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clip::ClipSource;

/// Input index of the base animation.
pub const BASE_INPUT: usize = 0;
/// Input index of the override slot.
pub const OVERRIDE_INPUT: usize = 1;
/// The base input always contributes at full weight.
pub const BASE_WEIGHT: f32 = 1.0;

/// Restricts the override layer to a subset of bones.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LayerMask {
    pub name: String,
    #[serde(default)]
    pub bones: Vec<String>,
}

impl LayerMask {
    pub fn new(name: impl Into<String>, bones: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            bones: bones.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the mask lets the override layer drive `bone`.
    pub fn affects(&self, bone: &str) -> bool {
        self.bones.iter().any(|b| b == bone)
    }
}

pub type MaskRef = Arc<LayerMask>;

/// Per-frame layer contribution, read by the host when it samples the final pose.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LayerSample {
    pub base_weight: f32,
    pub override_weight: f32,
    pub override_connected: bool,
    pub additive: bool,
    /// Name of the mask applied to the override layer, if any.
    pub mask: Option<String>,
    /// Local time of the override source, if connected.
    pub override_time: Option<f32>,
}

impl LayerSample {
    /// Whether the override layer changes the final pose this frame.
    pub fn override_contributes(&self) -> bool {
        self.override_connected && self.override_weight > 0.0
    }
}

#[derive(Debug)]
pub struct BlendGraph {
    valid: bool,
    source: Option<Box<dyn ClipSource>>,
    weight: f32,
    mask: Option<MaskRef>,
    additive: bool,
}

impl Default for BlendGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl BlendGraph {
    pub fn new() -> Self {
        Self {
            valid: true,
            source: None,
            weight: 0.0,
            mask: None,
            additive: false,
        }
    }

    /// False once the graph has been torn down.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Destroy the graph. Later operations are absorbed silently.
    pub fn teardown(&mut self) {
        if !self.valid {
            return;
        }
        debug!("blend graph: teardown");
        self.source = None;
        self.weight = 0.0;
        self.mask = None;
        self.additive = false;
        self.valid = false;
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.valid && self.source.is_some()
    }

    /// Connect `source` to the override input at weight 0.
    ///
    /// Returns false (and drops the source) when the graph was torn down. An already
    /// connected source is disconnected first so the slot never holds two.
    pub fn connect(&mut self, source: Box<dyn ClipSource>) -> bool {
        if !self.valid {
            return false;
        }
        if self.source.is_some() {
            warn!("blend graph: override input already connected; replacing");
            self.disconnect();
        }
        self.source = Some(source);
        self.weight = 0.0;
        true
    }

    /// Disconnect the override input, returning its source for destruction.
    pub fn disconnect(&mut self) -> Option<Box<dyn ClipSource>> {
        if !self.valid {
            return None;
        }
        self.weight = 0.0;
        self.mask = None;
        self.additive = false;
        self.source.take()
    }

    /// Set the override weight, clamped to `[0, 1]`.
    pub fn set_weight(&mut self, weight: f32) {
        if !self.is_connected() {
            return;
        }
        self.weight = if weight.is_finite() {
            weight.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Current override weight (0 while disconnected).
    #[inline]
    pub fn override_weight(&self) -> f32 {
        if self.is_connected() {
            self.weight
        } else {
            0.0
        }
    }

    pub fn set_mask(&mut self, mask: Option<MaskRef>) {
        if !self.is_connected() {
            return;
        }
        self.mask = mask;
    }

    pub fn mask(&self) -> Option<&MaskRef> {
        self.mask.as_ref()
    }

    pub fn set_additive(&mut self, additive: bool) {
        if !self.is_connected() {
            return;
        }
        self.additive = additive;
    }

    pub fn is_additive(&self) -> bool {
        self.additive
    }

    pub fn source(&self) -> Option<&dyn ClipSource> {
        if !self.valid {
            return None;
        }
        self.source.as_deref()
    }

    pub fn source_mut(&mut self) -> Option<&mut (dyn ClipSource + 'static)> {
        if !self.valid {
            return None;
        }
        self.source.as_deref_mut()
    }

    /// Advance the connected source's own clock by `dt`.
    pub fn evaluate(&mut self, dt: f32) {
        if let Some(source) = self.source_mut() {
            source.advance(dt);
        }
    }

    pub fn sample(&self) -> LayerSample {
        LayerSample {
            base_weight: if self.valid { BASE_WEIGHT } else { 0.0 },
            override_weight: self.override_weight(),
            override_connected: self.is_connected(),
            additive: self.is_connected() && self.additive,
            mask: self
                .mask
                .as_ref()
                .filter(|_| self.is_connected())
                .map(|m| m.name.clone()),
            override_time: self.source().map(|s| s.time()),
        }
    }
}
