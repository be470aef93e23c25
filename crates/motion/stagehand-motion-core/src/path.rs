//! Path collaborator trait and a polyline implementation.
//!
//! A path answers "where am I at `t`" in its own local space. Its transform maps
//! positions and tangents to world space. Hosts with real spline assets implement
//! [`Path`] over them; [`PolylinePath`] covers tests and simple authored routes.

use std::fmt;
use std::sync::Arc;

use nalgebra::{Point3, Similarity3, Vector3};
use serde::{Deserialize, Serialize};

/// Local-space sample of a path at a normalized parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathSample {
    pub position: Point3<f32>,
    /// Direction of travel. Not necessarily unit length.
    pub tangent: Vector3<f32>,
}

pub trait Path: fmt::Debug + Send + Sync {
    /// Sample at `t ∈ [0,1]`. `None` when the path has no points.
    fn evaluate(&self, t: f32) -> Option<PathSample>;

    /// Local-to-world transform of the path.
    fn transform(&self) -> Similarity3<f32>;
}

pub type PathRef = Arc<dyn Path>;

fn identity_transform() -> Similarity3<f32> {
    Similarity3::identity()
}

/// Serialized form: points and transform only, the length table is derived.
#[derive(Clone, Serialize, Deserialize)]
struct PolylineData {
    points: Vec<Point3<f32>>,
    #[serde(default = "identity_transform")]
    transform: Similarity3<f32>,
}

/// Piecewise-linear path parameterized by arc length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolylineData", into = "PolylineData")]
pub struct PolylinePath {
    points: Vec<Point3<f32>>,
    pub transform: Similarity3<f32>,
    /// Arc length at each point; always as long as `points`.
    cumulative: Vec<f32>,
}

impl From<PolylineData> for PolylinePath {
    fn from(data: PolylineData) -> Self {
        Self::new(data.points).with_transform(data.transform)
    }
}

impl From<PolylinePath> for PolylineData {
    fn from(path: PolylinePath) -> Self {
        Self {
            points: path.points,
            transform: path.transform,
        }
    }
}

impl PolylinePath {
    pub fn new(points: Vec<Point3<f32>>) -> Self {
        let mut path = Self {
            points,
            transform: Similarity3::identity(),
            cumulative: Vec::new(),
        };
        path.rebuild_lengths();
        path
    }

    pub fn points(&self) -> &[Point3<f32>] {
        &self.points
    }

    /// Replace the points and recompute arc lengths.
    pub fn set_points(&mut self, points: Vec<Point3<f32>>) {
        self.points = points;
        self.rebuild_lengths();
    }

    pub fn with_transform(mut self, transform: Similarity3<f32>) -> Self {
        self.transform = transform;
        self
    }

    pub fn into_ref(self) -> PathRef {
        Arc::new(self)
    }

    fn rebuild_lengths(&mut self) {
        self.cumulative.clear();
        let mut total = 0.0;
        for (i, p) in self.points.iter().enumerate() {
            if i > 0 {
                total += (p - self.points[i - 1]).norm();
            }
            self.cumulative.push(total);
        }
    }

    /// Total arc length in local units.
    pub fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }
}

impl Path for PolylinePath {
    fn evaluate(&self, t: f32) -> Option<PathSample> {
        let first = *self.points.first()?;
        let total = self.length();
        if self.points.len() < 2 || total <= 0.0 {
            return Some(PathSample {
                position: first,
                tangent: Vector3::zeros(),
            });
        }

        let target = t.clamp(0.0, 1.0) * total;
        // First segment whose end reaches the target distance.
        let seg = self
            .cumulative
            .iter()
            .skip(1)
            .position(|d| *d >= target)
            .unwrap_or(self.points.len() - 2);
        let (a, b) = (self.points[seg], self.points[seg + 1]);
        let (da, db) = (self.cumulative[seg], self.cumulative[seg + 1]);
        let span = db - da;
        let u = if span > 0.0 { (target - da) / span } else { 0.0 };
        Some(PathSample {
            position: a + (b - a) * u,
            tangent: b - a,
        })
    }

    fn transform(&self) -> Similarity3<f32> {
        self.transform
    }
}
