// THEORY:
// Landmarks are consumed, never produced, here. A `LandmarkSet` is whatever the external
// face-mesh or pose detector reported for one frame: an ordered list of points, each
// optionally carrying a visibility confidence.
//
// The index semantics (234 = left jaw, 11 = left shoulder, ...) belong to the detector.
// They are named below so the classifiers never deal in bare integers, but nothing here
// can verify that a detector upgrade kept them stable.

use serde::{Deserialize, Serialize};

/// A detector keypoint. Pose coordinates are normalized to the frame; face-mesh
/// coordinates may be normalized or pixel-space, which ratios do not care about.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Distance in the image plane; depth is ignored.
    pub fn planar_distance(&self, other: &Landmark) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// A landmark without a visibility score never passes a visibility gate.
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility.is_some_and(|v| v > threshold)
    }
}

/// Face-mesh indices the face classifier reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceLandmark {
    Forehead = 10,
    Chin = 152,
    LeftJaw = 234,
    RightJaw = 454,
}

/// Pose indices the body classifier reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseLandmark {
    LeftEye = 2,
    RightEye = 5,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftHip = 23,
    RightHip = 24,
}

impl PoseLandmark {
    /// Landmarks that must clear the visibility gate on every counted frame.
    pub const TORSO: [PoseLandmark; 4] = [
        PoseLandmark::LeftShoulder,
        PoseLandmark::RightShoulder,
        PoseLandmark::LeftHip,
        PoseLandmark::RightHip,
    ];
}

/// One frame's worth of detector output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn face(&self, landmark: FaceLandmark) -> Option<&Landmark> {
        self.get(landmark as usize)
    }

    pub fn pose(&self, landmark: PoseLandmark) -> Option<&Landmark> {
        self.get(landmark as usize)
    }

    /// Replaces a single point, growing the set with default points if needed.
    pub fn set(&mut self, index: usize, landmark: Landmark) {
        if self.points.len() <= index {
            self.points.resize(index + 1, Landmark::default());
        }
        self.points[index] = landmark;
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(points: Vec<Landmark>) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_distance_ignores_depth() {
        let mut a = Landmark::new(0.0, 0.0);
        let b = Landmark::new(3.0, 4.0);
        a.z = 100.0;
        assert_eq!(a.planar_distance(&b), 5.0);
    }

    #[test]
    fn visibility_is_strictly_above_threshold() {
        let landmark = Landmark::new(0.5, 0.5);
        assert!(!landmark.is_visible(0.5));
        assert!(!landmark.with_visibility(0.5).is_visible(0.5));
        assert!(landmark.with_visibility(0.51).is_visible(0.5));
    }

    #[test]
    fn named_lookups_use_detector_indices() {
        let mut set = LandmarkSet::default();
        set.set(454, Landmark::new(1.0, 2.0));
        assert_eq!(set.len(), 455);
        assert_eq!(set.face(FaceLandmark::RightJaw), Some(&Landmark::new(1.0, 2.0)));
        assert!(set.pose(PoseLandmark::RightHip).is_some());
        assert!(LandmarkSet::default().pose(PoseLandmark::LeftEye).is_none());
    }

    #[test]
    fn deserializes_detector_json() {
        let json = r#"[{"x": 0.1, "y": 0.2, "visibility": 0.9}, {"x": 0.3, "y": 0.4, "z": -0.1}]"#;
        let set: LandmarkSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.points()[0].visibility, Some(0.9));
        assert_eq!(set.points()[1].visibility, None);
    }
}
