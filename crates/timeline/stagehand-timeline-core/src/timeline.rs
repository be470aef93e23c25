//! Timeline asset: ordered tracks of markers.
//!
//! Authoring order is track order, then marker order within a track. It breaks
//! ties between markers sharing a timestamp.

use serde::{Deserialize, Serialize};

use crate::ids::TrackId;
use crate::markers::{ActivationMarker, PathCommandMarker};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivationTrack {
    pub id: TrackId,
    #[serde(default)]
    pub markers: Vec<ActivationMarker>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathCommandTrack {
    pub id: TrackId,
    #[serde(default)]
    pub markers: Vec<PathCommandMarker>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Track {
    Activation(ActivationTrack),
    PathCommands(PathCommandTrack),
}

impl Track {
    pub fn id(&self) -> TrackId {
        match self {
            Track::Activation(t) => t.id,
            Track::PathCommands(t) => t.id,
        }
    }

    fn marker_times(&self) -> Vec<f32> {
        match self {
            Track::Activation(t) => t.markers.iter().map(|m| m.time).collect(),
            Track::PathCommands(t) => t.markers.iter().map(|m| m.time).collect(),
        }
    }
}

/// Position of a marker in authoring order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerAddress {
    pub track: usize,
    pub marker: usize,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MarkerView<'a> {
    Activation {
        track: TrackId,
        marker: &'a ActivationMarker,
    },
    PathCommand {
        track: TrackId,
        marker: &'a PathCommandMarker,
    },
}

impl MarkerView<'_> {
    pub fn time(&self) -> f32 {
        match self {
            MarkerView::Activation { marker, .. } => marker.time,
            MarkerView::PathCommand { marker, .. } => marker.time,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn marker(&self, addr: MarkerAddress) -> Option<MarkerView<'_>> {
        match self.tracks.get(addr.track)? {
            Track::Activation(t) => t.markers.get(addr.marker).map(|marker| MarkerView::Activation {
                track: t.id,
                marker,
            }),
            Track::PathCommands(t) => {
                t.markers
                    .get(addr.marker)
                    .map(|marker| MarkerView::PathCommand {
                        track: t.id,
                        marker,
                    })
            }
        }
    }

    /// Every activation marker with its track, in authoring order.
    pub fn activation_markers(&self) -> impl Iterator<Item = (TrackId, &ActivationMarker)> {
        self.tracks.iter().flat_map(|track| {
            let markers: &[ActivationMarker] = match track {
                Track::Activation(t) => &t.markers,
                Track::PathCommands(_) => &[],
            };
            let id = track.id();
            markers.iter().map(move |m| (id, m))
        })
    }

    /// Addresses of markers with `from < time <= to` (no lower bound for `None`),
    /// sorted by time with authoring order kept among equal times.
    /// Markers with a non-finite time are never scheduled.
    pub fn markers_in(&self, from: Option<f32>, to: f32) -> Vec<MarkerAddress> {
        let mut hits: Vec<(f32, MarkerAddress)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            for (mi, time) in track.marker_times().into_iter().enumerate() {
                let after_start = from.map_or(true, |f| time > f);
                if time.is_finite() && after_start && time <= to {
                    hits.push((time, MarkerAddress { track: ti, marker: mi }));
                }
            }
        }
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, addr)| addr).collect()
    }

    /// Latest marker time, or 0 for an empty timeline.
    pub fn duration(&self) -> f32 {
        self.tracks
            .iter()
            .flat_map(|t| t.marker_times())
            .filter(|time| time.is_finite())
            .fold(0.0, f32::max)
    }
}
