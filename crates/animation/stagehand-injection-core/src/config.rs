//! Injector configuration: request defaults and hand-off timings.

use serde::{Deserialize, Serialize};

use crate::graph::LayerMask;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorConfig {
    /// Fade-in used when a request leaves it unset (or negative).
    pub default_fade_in: f32,
    /// Fade-out used when a request leaves it unset (or negative).
    pub default_fade_out: f32,
    /// Layer weight used when a request leaves it unset (or negative).
    pub default_weight: f32,
    /// Mask applied when a request carries none.
    pub default_mask: Option<LayerMask>,
    /// OR-ed with the request's additive flag.
    pub default_additive: bool,
    /// Fade-out forced on an active session when a new request preempts it.
    pub handoff_fade_out: f32,
    /// Fade-out used by `stop_active_injection` when none is given.
    pub stop_fade_out: f32,
    /// Smallest accepted |speed|; also the floor when computing clip duration.
    pub min_speed: f32,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            default_fade_in: 0.1,
            default_fade_out: 0.1,
            default_weight: 1.0,
            default_mask: None,
            default_additive: false,
            handoff_fade_out: 0.05,
            stop_fade_out: 0.1,
            min_speed: 1e-4,
        }
    }
}

impl InjectorConfig {
    /// Parse a partial JSON config; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg =
            InjectorConfig::from_json(r#"{ "default_fade_in": 0.25 }"#).expect("config parses");
        assert_eq!(cfg.default_fade_in, 0.25);
        assert_eq!(cfg.handoff_fade_out, 0.05);
        assert_eq!(cfg.default_weight, 1.0);
    }
}
