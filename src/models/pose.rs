// Data models for body landmarks produced by the pose estimator

use serde::{Deserialize, Serialize};

/// Number of canonical body points in a landmark set
pub const BODY_LANDMARK_COUNT: usize = 33;

// ==============================================================================
// Landmark Point
// ==============================================================================

/// A single detected body keypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32, // Normalized [0, 1] relative to frame width
    pub y: f32, // Normalized [0, 1] relative to frame height
    pub z: f32, // Depth relative to the hip midpoint
    #[serde(default = "default_visibility")]
    pub visibility: f32, // Detection confidence [0, 1]
}

fn default_visibility() -> f32 {
    1.0
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    /// A point whose image coordinates can be projected into pixel space
    pub fn has_valid_coordinates(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Project the normalized position onto a frame of the given size
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

// ==============================================================================
// Body Landmark indices (33 total)
// ==============================================================================

/// Anatomical role to landmark index mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    pub fn index(self) -> usize {
        self as usize
    }

    /// The point used as the head position for sampling and height
    pub const HEAD: BodyLandmark = BodyLandmark::Nose;

    /// The point used as the lowest body position for height
    pub const FOOT: BodyLandmark = BodyLandmark::RightFootIndex;
}

// ==============================================================================
// Landmark Set
// ==============================================================================

/// All body landmarks detected in one frame, indexed by anatomical position.
///
/// Positions the estimator did not report, or reported with non-finite
/// coordinates, are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<Option<LandmarkPoint>>,
}

impl LandmarkSet {
    /// Build a set from a dense list of points in canonical order
    pub fn from_points(points: Vec<LandmarkPoint>) -> Self {
        Self::from_optional(points.into_iter().map(Some).collect())
    }

    /// Build a set where individual positions may be missing
    pub fn from_optional(mut points: Vec<Option<LandmarkPoint>>) -> Self {
        points.resize(BODY_LANDMARK_COUNT, None);
        for slot in points.iter_mut() {
            if slot.map_or(false, |p| !p.has_valid_coordinates()) {
                *slot = None;
            }
        }
        Self { points }
    }

    /// Point at a raw index, if present
    pub fn point(&self, index: usize) -> Option<&LandmarkPoint> {
        self.points.get(index).and_then(|p| p.as_ref())
    }

    pub fn get(&self, landmark: BodyLandmark) -> Option<&LandmarkPoint> {
        self.point(landmark.index())
    }

    pub fn present_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

// ==============================================================================
// Retained Landmarks
// ==============================================================================

/// The last landmark set observed during a scan, with the frame it came from
#[derive(Debug, Clone)]
pub struct RetainedLandmarks {
    pub landmarks: LandmarkSet,
    pub frame_index: u64,
    pub timestamp: i64, // Capture time in milliseconds
}

impl RetainedLandmarks {
    pub fn age_ms(&self, now: i64) -> i64 {
        (now - self.timestamp).max(0)
    }

    /// Whether the set is older than `max_age_ms` relative to `now`
    pub fn is_stale(&self, now: i64, max_age_ms: Option<u64>) -> bool {
        match max_age_ms {
            Some(max) => self.age_ms(now) as u64 > max,
            None => false,
        }
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    #[error("Landmark provider not initialized")]
    NotInitialized,

    #[error("Model loading failed: {0}")]
    ModelLoadFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid landmark data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PoseResult<T> = Result<T, PoseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_visibility() {
        let point = LandmarkPoint::new(0.5, 0.5, 0.0, 0.8);
        assert!(point.is_visible(0.5));
        assert!(point.is_visible(0.7));
        assert!(!point.is_visible(0.9));
    }

    #[test]
    fn test_set_is_padded_to_canonical_size() {
        let set = LandmarkSet::from_points(vec![LandmarkPoint::new(0.1, 0.2, 0.0, 1.0)]);
        assert_eq!(set.len(), BODY_LANDMARK_COUNT);
        assert_eq!(set.present_count(), 1);
        assert!(set.get(BodyLandmark::Nose).is_some());
        assert!(set.get(BodyLandmark::RightFootIndex).is_none());
        assert!(set.point(100).is_none());
    }

    #[test]
    fn test_non_finite_points_are_absent() {
        let set = LandmarkSet::from_points(vec![
            LandmarkPoint::new(f32::NAN, 0.2, 0.0, 1.0),
            LandmarkPoint::new(0.3, 0.4, 0.0, 1.0),
        ]);
        assert!(set.point(0).is_none());
        assert!(set.point(1).is_some());
    }

    #[test]
    fn test_staleness() {
        let retained = RetainedLandmarks {
            landmarks: LandmarkSet::from_points(vec![]),
            frame_index: 3,
            timestamp: 1_000,
        };
        assert!(!retained.is_stale(5_000, None));
        assert!(!retained.is_stale(1_500, Some(500)));
        assert!(retained.is_stale(1_501, Some(500)));
    }

    #[test]
    fn test_to_pixel() {
        let point = LandmarkPoint::new(0.5, 0.25, 0.0, 1.0);
        assert_eq!(point.to_pixel(640, 480), (320.0, 120.0));
    }
}
