use serde::{Deserialize, Serialize};
use stagehand_injection::InjectorConfig;
use stagehand_motion::FollowerConfig;

/// Activation receiver settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Apply notifications and rebuilds while the context is not playing.
    pub apply_during_scrub: bool,
    /// State for targets with no marker at or before the rebuild time.
    pub default_active_when_no_marker: bool,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            apply_during_scrub: true,
            default_active_when_no_marker: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubConfig {
    /// Time changes at or below this are treated as no change.
    pub epsilon: f32,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self { epsilon: 1e-4 }
    }
}

/// Settings for every component a stage owns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub injector: InjectorConfig,
    pub follower: FollowerConfig,
    pub activation: ActivationConfig,
    pub scrub: ScrubConfig,
}

impl StageConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
