// Body shape and height estimation from normalized landmark geometry

use crate::models::classification::{BodyMeasurements, BodyType};
use crate::models::pose::{BodyLandmark, LandmarkSet};
use tracing::debug;

/// Waist is approximated as this fraction of the shoulder/hip average
const WAIST_FACTOR: f32 = 0.8;
/// One width dominates the other when it is this much larger
const DOMINANCE_RATIO: f32 = 1.2;
const BALANCED_TOLERANCE: f32 = 0.1;
const HOURGLASS_WAIST_RATIO: f32 = 0.8;

impl BodyMeasurements {
    /// Measure widths and span. `None` if either shoulder or hip is missing.
    pub fn from_landmarks(landmarks: &LandmarkSet) -> Option<Self> {
        let ls = landmarks.get(BodyLandmark::LeftShoulder)?;
        let rs = landmarks.get(BodyLandmark::RightShoulder)?;
        let lh = landmarks.get(BodyLandmark::LeftHip)?;
        let rh = landmarks.get(BodyLandmark::RightHip)?;

        let shoulder_width = (ls.x - rs.x).abs();
        let hip_width = (lh.x - rh.x).abs();
        let waist_width = (shoulder_width + hip_width) / 2.0 * WAIST_FACTOR;

        let vertical_span = match (
            landmarks.get(BodyLandmark::HEAD),
            landmarks.get(BodyLandmark::FOOT),
        ) {
            (Some(head), Some(foot)) => Some((head.y - foot.y).abs()),
            _ => None,
        };

        Some(Self {
            shoulder_width,
            hip_width,
            waist_width,
            vertical_span,
        })
    }

    /// First matching rule wins; Rectangle when none match
    pub fn classify(&self) -> BodyType {
        let s = self.shoulder_width;
        let h = self.hip_width;

        if s > h * DOMINANCE_RATIO {
            BodyType::InvertedTriangle
        } else if h > s * DOMINANCE_RATIO {
            BodyType::Triangle
        } else if (s - h).abs() < BALANCED_TOLERANCE && self.waist_width < s * HOURGLASS_WAIST_RATIO {
            BodyType::Hourglass
        } else {
            BodyType::Rectangle
        }
    }
}

/// Height from a normalized head-to-foot span, rounded to two decimals
pub fn estimate_height_cm(
    vertical_span: f32,
    frame_height: f32,
    reference_frame_height: f32,
    reference_height_cm: f32,
) -> f32 {
    let height = (vertical_span * frame_height / reference_frame_height) * reference_height_cm;
    (height * 100.0).round() / 100.0
}

pub struct BodyTypeClassifier {
    reference_frame_height: f32,
    reference_height_cm: f32,
}

impl BodyTypeClassifier {
    pub fn new(reference_frame_height: f32, reference_height_cm: f32) -> Self {
        Self {
            reference_frame_height,
            reference_height_cm,
        }
    }

    /// Shape and height for a landmark set; `(Unknown, 0.0)` without one
    pub fn classify(&self, landmarks: Option<&LandmarkSet>, frame_height: u32) -> (BodyType, f32) {
        let measurements = match landmarks.and_then(BodyMeasurements::from_landmarks) {
            Some(m) => m,
            None => return (BodyType::Unknown, 0.0),
        };

        let body_type = measurements.classify();
        let height_cm = measurements
            .vertical_span
            .map(|span| {
                estimate_height_cm(
                    span,
                    frame_height as f32,
                    self.reference_frame_height,
                    self.reference_height_cm,
                )
            })
            .unwrap_or(0.0);

        debug!(
            "Body measurements: shoulders {:.3}, hips {:.3}, waist {:.3} -> {} / {:.2} cm",
            measurements.shoulder_width,
            measurements.hip_width,
            measurements.waist_width,
            body_type.to_string(),
            height_cm
        );

        (body_type, height_cm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::{LandmarkPoint, BODY_LANDMARK_COUNT};
    use approx::assert_relative_eq;

    fn measurements(shoulder: f32, hip: f32, waist: f32) -> BodyMeasurements {
        BodyMeasurements {
            shoulder_width: shoulder,
            hip_width: hip,
            waist_width: waist,
            vertical_span: None,
        }
    }

    fn body(shoulder: f32, hip: f32, head_y: f32, foot_y: Option<f32>) -> LandmarkSet {
        let mut points = vec![None; BODY_LANDMARK_COUNT];
        let at = |x: f32, y: f32| Some(LandmarkPoint::new(x, y, 0.0, 1.0));
        points[0] = at(0.5, head_y);
        points[11] = at(0.5 + shoulder / 2.0, 0.3);
        points[12] = at(0.5 - shoulder / 2.0, 0.3);
        points[23] = at(0.5 + hip / 2.0, 0.55);
        points[24] = at(0.5 - hip / 2.0, 0.55);
        if let Some(y) = foot_y {
            points[32] = at(0.45, y);
        }
        LandmarkSet::from_optional(points)
    }

    #[test]
    fn test_inverted_triangle_takes_precedence() {
        assert_eq!(measurements(0.30, 0.20, 0.10).classify(), BodyType::InvertedTriangle);
    }

    #[test]
    fn test_triangle() {
        assert_eq!(measurements(0.20, 0.30, 0.10).classify(), BodyType::Triangle);
    }

    #[test]
    fn test_hourglass() {
        assert_eq!(measurements(0.20, 0.21, 0.15).classify(), BodyType::Hourglass);
    }

    #[test]
    fn test_rectangle_default() {
        assert_eq!(measurements(0.20, 0.20, 0.20).classify(), BodyType::Rectangle);
    }

    #[test]
    fn test_waist_proxy() {
        let m = BodyMeasurements::from_landmarks(&body(0.30, 0.20, 0.1, Some(0.6))).unwrap();
        assert_relative_eq!(m.shoulder_width, 0.30, epsilon = 1e-6);
        assert_relative_eq!(m.hip_width, 0.20, epsilon = 1e-6);
        assert_relative_eq!(m.waist_width, 0.20, epsilon = 1e-6);
        assert_relative_eq!(m.vertical_span.unwrap(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_height_formula() {
        assert_eq!(estimate_height_cm(0.5, 480.0, 480.0, 170.0), 85.00);
        assert_eq!(estimate_height_cm(0.5, 960.0, 480.0, 170.0), 170.00);
        assert_eq!(estimate_height_cm(0.123, 480.0, 480.0, 170.0), 20.91);
    }

    #[test]
    fn test_classifier_on_landmarks() {
        let classifier = BodyTypeClassifier::new(480.0, 170.0);
        let landmarks = body(0.30, 0.20, 0.25, Some(0.75));
        let (body_type, height) = classifier.classify(Some(&landmarks), 480);
        assert_eq!(body_type, BodyType::InvertedTriangle);
        assert_relative_eq!(height, 85.0, epsilon = 0.01);
    }

    #[test]
    fn test_no_landmarks() {
        let classifier = BodyTypeClassifier::new(480.0, 170.0);
        assert_eq!(classifier.classify(None, 480), (BodyType::Unknown, 0.0));
    }

    #[test]
    fn test_missing_hips_is_unknown() {
        let classifier = BodyTypeClassifier::new(480.0, 170.0);
        let mut points = vec![None; BODY_LANDMARK_COUNT];
        points[11] = Some(LandmarkPoint::new(0.6, 0.3, 0.0, 1.0));
        points[12] = Some(LandmarkPoint::new(0.4, 0.3, 0.0, 1.0));
        let landmarks = LandmarkSet::from_optional(points);
        assert_eq!(classifier.classify(Some(&landmarks), 480), (BodyType::Unknown, 0.0));
    }

    #[test]
    fn test_missing_foot_keeps_shape() {
        let classifier = BodyTypeClassifier::new(480.0, 170.0);
        let landmarks = body(0.20, 0.30, 0.1, None);
        assert_eq!(classifier.classify(Some(&landmarks), 480), (BodyType::Triangle, 0.0));
    }
}
