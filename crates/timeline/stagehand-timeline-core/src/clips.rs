//! Clip lookup for markers that name a clip by key.

use hashbrown::HashMap;
use stagehand_injection::ClipRef;

#[derive(Debug, Default, Clone)]
pub struct ClipLibrary {
    clips: HashMap<String, ClipRef>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the clip's own name, replacing any clip with that name.
    pub fn insert(&mut self, clip: ClipRef) -> Option<ClipRef> {
        self.clips.insert(clip.name().to_string(), clip)
    }

    pub fn insert_as(&mut self, key: impl Into<String>, clip: ClipRef) -> Option<ClipRef> {
        self.clips.insert(key.into(), clip)
    }

    pub fn get(&self, key: &str) -> Option<ClipRef> {
        self.clips.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl FromIterator<ClipRef> for ClipLibrary {
    fn from_iter<I: IntoIterator<Item = ClipRef>>(iter: I) -> Self {
        let mut lib = Self::new();
        for clip in iter {
            lib.insert(clip);
        }
        lib
    }
}
