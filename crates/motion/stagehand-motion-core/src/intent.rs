//! Injection side effects of follower commands.
//!
//! The follower never holds an injector. Commands that want a clip played (or the
//! live override stopped) hand back an [`InjectionIntent`] which the caller applies
//! to whichever injector animates the same subject.

use std::fmt;

use stagehand_injection::{AnimInjection, ClipRef, InjectionError, PlayClip, PlayOutcome};

/// A clip attached to a path command.
#[derive(Clone)]
pub struct ClipCue {
    pub clip: ClipRef,
    pub return_to_base: bool,
}

impl fmt::Debug for ClipCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipCue")
            .field("clip", &self.clip.name())
            .field("return_to_base", &self.return_to_base)
            .finish()
    }
}

impl ClipCue {
    pub fn new(clip: ClipRef, return_to_base: bool) -> Self {
        Self {
            clip,
            return_to_base,
        }
    }

    /// Play call with injector defaults for fades, weight and mask, at speed 1.
    pub fn to_play(&self) -> PlayClip {
        PlayClip::new(self.clip.clone()).return_to_base(self.return_to_base)
    }
}

#[derive(Clone, Debug)]
pub enum InjectionIntent {
    Play(ClipCue),
    /// Smooth stop with the injector's configured stop fade.
    Stop,
}

/// What applying an intent did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntentOutcome {
    Played(PlayOutcome),
    Stopped,
    /// Stop requested while nothing was injecting.
    NothingToStop,
}

impl InjectionIntent {
    pub fn apply(&self, injector: &mut dyn AnimInjection) -> Result<IntentOutcome, InjectionError> {
        match self {
            InjectionIntent::Play(cue) => injector.play_clip(cue.to_play()).map(IntentOutcome::Played),
            InjectionIntent::Stop => Ok(if injector.stop_active_injection(None) {
                IntentOutcome::Stopped
            } else {
                IntentOutcome::NothingToStop
            }),
        }
    }
}
