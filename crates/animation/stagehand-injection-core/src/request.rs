//! Play-call arguments and the resolved, immutable override request.

use std::fmt;

use crate::clip::ClipRef;
use crate::config::InjectorConfig;
use crate::error::InjectionError;
use crate::graph::MaskRef;

/// Arguments to a "play override clip" call.
///
/// `None` (or a negative value) for fades and weight means "use the injector default".
#[derive(Clone)]
pub struct PlayClip {
    pub clip: Option<ClipRef>,
    pub fade_in: Option<f32>,
    pub fade_out: Option<f32>,
    pub target_weight: Option<f32>,
    pub mask: Option<MaskRef>,
    pub additive: bool,
    pub speed: f32,
    /// Play once and hand control back, or hold the clip until aborted.
    pub return_to_base: bool,
}

impl Default for PlayClip {
    fn default() -> Self {
        Self {
            clip: None,
            fade_in: None,
            fade_out: None,
            target_weight: None,
            mask: None,
            additive: false,
            speed: 1.0,
            return_to_base: true,
        }
    }
}

impl fmt::Debug for PlayClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayClip")
            .field("clip", &self.clip.as_ref().map(|c| c.name().to_string()))
            .field("fade_in", &self.fade_in)
            .field("fade_out", &self.fade_out)
            .field("target_weight", &self.target_weight)
            .field("mask", &self.mask.as_ref().map(|m| m.name.clone()))
            .field("additive", &self.additive)
            .field("speed", &self.speed)
            .field("return_to_base", &self.return_to_base)
            .finish()
    }
}

impl PlayClip {
    pub fn new(clip: ClipRef) -> Self {
        Self {
            clip: Some(clip),
            ..Self::default()
        }
    }

    pub fn fade_in(mut self, seconds: f32) -> Self {
        self.fade_in = Some(seconds);
        self
    }

    pub fn fade_out(mut self, seconds: f32) -> Self {
        self.fade_out = Some(seconds);
        self
    }

    pub fn target_weight(mut self, weight: f32) -> Self {
        self.target_weight = Some(weight);
        self
    }

    pub fn mask(mut self, mask: MaskRef) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn additive(mut self, additive: bool) -> Self {
        self.additive = additive;
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn return_to_base(mut self, return_to_base: bool) -> Self {
        self.return_to_base = return_to_base;
        self
    }
}

/// A validated request with every default resolved. Never mutated after creation.
#[derive(Clone)]
pub struct OverrideRequest {
    clip: ClipRef,
    fade_in: f32,
    fade_out: f32,
    target_weight: f32,
    mask: Option<MaskRef>,
    additive: bool,
    speed: f32,
    return_to_base: bool,
}

impl fmt::Debug for OverrideRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideRequest")
            .field("clip", &self.clip.name())
            .field("fade_in", &self.fade_in)
            .field("fade_out", &self.fade_out)
            .field("target_weight", &self.target_weight)
            .field("mask", &self.mask.as_ref().map(|m| m.name.as_str()))
            .field("additive", &self.additive)
            .field("speed", &self.speed)
            .field("return_to_base", &self.return_to_base)
            .finish()
    }
}

fn resolve_non_negative(
    clip: &str,
    field: &str,
    value: Option<f32>,
    default: f32,
) -> Result<f32, InjectionError> {
    match value {
        None => Ok(default.max(0.0)),
        Some(v) if !v.is_finite() => Err(InjectionError::InvalidValue {
            clip: clip.to_string(),
            field: field.to_string(),
            value: v,
        }),
        Some(v) if v < 0.0 => Ok(default.max(0.0)),
        Some(v) => Ok(v),
    }
}

impl OverrideRequest {
    /// Validate `args` and fill unset fields from `cfg`.
    pub fn resolve(
        args: PlayClip,
        cfg: &InjectorConfig,
        default_mask: Option<&MaskRef>,
    ) -> Result<Self, InjectionError> {
        let clip = args.clip.ok_or(InjectionError::MissingClip)?;
        let name = clip.name().to_string();

        if !args.speed.is_finite() || args.speed.abs() < cfg.min_speed {
            return Err(InjectionError::InvalidSpeed {
                clip: name,
                speed: args.speed,
            });
        }

        let fade_in = resolve_non_negative(&name, "fade_in", args.fade_in, cfg.default_fade_in)?;
        let fade_out =
            resolve_non_negative(&name, "fade_out", args.fade_out, cfg.default_fade_out)?;
        let target_weight = resolve_non_negative(
            &name,
            "target_weight",
            args.target_weight,
            cfg.default_weight,
        )?
        .clamp(0.0, 1.0);

        Ok(Self {
            clip,
            fade_in,
            fade_out,
            target_weight,
            mask: args.mask.or_else(|| default_mask.cloned()),
            additive: args.additive || cfg.default_additive,
            speed: args.speed,
            return_to_base: args.return_to_base,
        })
    }

    pub fn clip(&self) -> &ClipRef {
        &self.clip
    }

    pub fn clip_name(&self) -> &str {
        self.clip.name()
    }

    pub fn fade_in(&self) -> f32 {
        self.fade_in
    }

    pub fn fade_out(&self) -> f32 {
        self.fade_out
    }

    pub fn target_weight(&self) -> f32 {
        self.target_weight
    }

    pub fn mask(&self) -> Option<&MaskRef> {
        self.mask.as_ref()
    }

    pub fn additive(&self) -> bool {
        self.additive
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn return_to_base(&self) -> bool {
        self.return_to_base
    }

    /// Intrinsic play-once duration: clip length / |speed|.
    pub fn clip_duration(&self, min_speed: f32) -> f32 {
        self.clip.length().max(0.0) / self.speed.abs().max(min_speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipData;
    use crate::graph::LayerMask;
    use std::sync::Arc;

    fn clip() -> ClipRef {
        ClipData::new("wave", 2.0).into_ref()
    }

    #[test]
    fn unset_and_negative_fields_take_defaults() {
        let cfg = InjectorConfig::default();
        let req = OverrideRequest::resolve(
            PlayClip::new(clip()).fade_in(-1.0).target_weight(-1.0),
            &cfg,
            None,
        )
        .expect("valid request");
        assert_eq!(req.fade_in(), cfg.default_fade_in);
        assert_eq!(req.fade_out(), cfg.default_fade_out);
        assert_eq!(req.target_weight(), cfg.default_weight);
        assert!(req.return_to_base());
    }

    #[test]
    fn weight_is_clamped_and_mask_falls_back() {
        let cfg = InjectorConfig {
            default_additive: true,
            ..InjectorConfig::default()
        };
        let default_mask = Arc::new(LayerMask::new("upper", ["spine", "head"]));
        let req = OverrideRequest::resolve(
            PlayClip::new(clip()).target_weight(3.0),
            &cfg,
            Some(&default_mask),
        )
        .expect("valid request");
        assert_eq!(req.target_weight(), 1.0);
        assert_eq!(req.mask().map(|m| m.name.as_str()), Some("upper"));
        assert!(req.additive());
    }

    #[test]
    fn rejects_missing_clip_and_zero_speed() {
        let cfg = InjectorConfig::default();
        assert_eq!(
            OverrideRequest::resolve(PlayClip::default(), &cfg, None).unwrap_err(),
            InjectionError::MissingClip
        );
        assert!(matches!(
            OverrideRequest::resolve(PlayClip::new(clip()).speed(0.0), &cfg, None),
            Err(InjectionError::InvalidSpeed { .. })
        ));
        assert!(matches!(
            OverrideRequest::resolve(PlayClip::new(clip()).fade_out(f32::NAN), &cfg, None),
            Err(InjectionError::InvalidValue { .. })
        ));
    }

    #[test]
    fn duration_scales_with_speed() {
        let req = OverrideRequest::resolve(
            PlayClip::new(clip()).speed(-2.0),
            &InjectorConfig::default(),
            None,
        )
        .expect("valid request");
        assert!((req.clip_duration(1e-4) - 1.0).abs() < 1e-6);
    }
}
