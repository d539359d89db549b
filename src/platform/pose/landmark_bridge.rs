// Landmark provider integration
// Wraps an external pose estimator and normalizes its output into landmark sets

use crate::models::capture::RawFrame;
use crate::models::pose::{
    LandmarkPoint, LandmarkSet, PoseError, PoseResult, BODY_LANDMARK_COUNT,
};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Options handed to the pose estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderOptions {
    pub min_detection_confidence: f32,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
        }
    }
}

/// Source of per-frame body landmarks.
///
/// `Ok(None)` means no body was found in the frame.
#[async_trait]
pub trait LandmarkProvider: Send + Sync {
    async fn detect(&self, frame: &RawFrame) -> PoseResult<Option<LandmarkSet>>;

    /// Number of points in each landmark set this provider produces
    fn point_count(&self) -> usize {
        BODY_LANDMARK_COUNT
    }

    fn get_model_info(&self) -> String;
}

// ==============================================================================
// Raw output adapter
// ==============================================================================

/// Convert one raw estimator result into a landmark set.
///
/// Accepts `null`, `{"keypoints": [...], "score": f}` or a bare keypoint array.
/// Results with no keypoints, or a score under the detection threshold, are no detection.
pub fn parse_landmarks(data: &Value, options: &ProviderOptions) -> PoseResult<Option<LandmarkSet>> {
    if data.is_null() {
        return Ok(None);
    }

    let keypoints = match data {
        Value::Array(items) => items,
        Value::Object(_) => {
            if let Some(score) = data.get("score").and_then(|s| s.as_f64()) {
                if (score as f32) < options.min_detection_confidence {
                    debug!("Discarding pose with score {:.2}", score);
                    return Ok(None);
                }
            }
            data.get("keypoints")
                .and_then(|k| k.as_array())
                .ok_or_else(|| PoseError::InvalidData("Missing body keypoints".to_string()))?
        }
        _ => {
            return Err(PoseError::InvalidData(format!(
                "Unexpected landmark payload: {}",
                data
            )))
        }
    };

    let points: Vec<Option<LandmarkPoint>> = keypoints.iter().map(parse_keypoint).collect();
    let set = LandmarkSet::from_optional(points);

    if set.is_empty() {
        Ok(None)
    } else {
        Ok(Some(set))
    }
}

fn parse_keypoint(kp: &Value) -> Option<LandmarkPoint> {
    let x = kp.get("x").and_then(|v| v.as_f64())?;
    let y = kp.get("y").and_then(|v| v.as_f64())?;
    Some(LandmarkPoint {
        x: x as f32,
        y: y as f32,
        z: kp.get("z").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
        visibility: kp.get("visibility").and_then(|v| v.as_f64()).unwrap_or(1.0) as f32,
    })
}

// ==============================================================================
// Replay Implementation (recorded estimator output)
// ==============================================================================

/// Plays back a recording of estimator results, one entry per frame, looping at the end
pub struct ReplayLandmarkProvider {
    frames: Vec<Option<LandmarkSet>>,
    cursor: AtomicUsize,
}

impl ReplayLandmarkProvider {
    pub fn from_value(recording: &Value, options: &ProviderOptions) -> PoseResult<Self> {
        let entries = recording
            .as_array()
            .ok_or_else(|| PoseError::InvalidData("Recording must be a JSON array".to_string()))?;

        let frames = entries
            .iter()
            .map(|entry| parse_landmarks(entry, options))
            .collect::<PoseResult<Vec<_>>>()?;

        if frames.is_empty() {
            return Err(PoseError::InvalidData("Recording has no frames".to_string()));
        }

        Ok(Self::from_frames(frames))
    }

    pub fn from_frames(frames: Vec<Option<LandmarkSet>>) -> Self {
        Self {
            frames,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn load(path: &Path, options: &ProviderOptions) -> PoseResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let recording: Value = serde_json::from_str(&contents)
            .map_err(|e| PoseError::ModelLoadFailed(format!("Failed to parse {}: {}", path.display(), e)))?;
        let provider = Self::from_value(&recording, options)?;
        info!("Loaded landmark recording with {} frames from {}", provider.frames.len(), path.display());
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl LandmarkProvider for ReplayLandmarkProvider {
    async fn detect(&self, _frame: &RawFrame) -> PoseResult<Option<LandmarkSet>> {
        if self.frames.is_empty() {
            return Err(PoseError::NotInitialized);
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        Ok(self.frames[i].clone())
    }

    fn get_model_info(&self) -> String {
        format!("Landmark replay ({} recorded frames)", self.frames.len())
    }
}

// ==============================================================================
// Null Implementation (no estimator available)
// ==============================================================================

/// Never detects a body
pub struct NullLandmarkProvider;

#[async_trait]
impl LandmarkProvider for NullLandmarkProvider {
    async fn detect(&self, _frame: &RawFrame) -> PoseResult<Option<LandmarkSet>> {
        Ok(None)
    }

    fn get_model_info(&self) -> String {
        "Null landmark provider (no pose estimation)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::BodyLandmark;
    use serde_json::json;

    fn frame() -> RawFrame {
        RawFrame::filled(4, 4, [0, 0, 0], 0)
    }

    #[test]
    fn test_parse_null_is_no_detection() {
        assert!(parse_landmarks(&Value::Null, &ProviderOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_parse_keypoints() {
        let data = json!({
            "score": 0.9,
            "keypoints": [
                { "x": 0.5, "y": 0.1, "z": -0.2, "visibility": 0.99 },
                { "x": 0.51, "y": 0.09 },
                { "y": 0.3 }
            ]
        });
        let set = parse_landmarks(&data, &ProviderOptions::default()).unwrap().unwrap();
        let nose = set.get(BodyLandmark::Nose).unwrap();
        assert_eq!(nose.x, 0.5);
        assert_eq!(nose.visibility, 0.99);
        assert_eq!(set.point(1).unwrap().visibility, 1.0);
        assert!(set.point(2).is_none());
        assert_eq!(set.present_count(), 2);
    }

    #[test]
    fn test_low_score_is_no_detection() {
        let data = json!({ "score": 0.3, "keypoints": [{ "x": 0.5, "y": 0.5 }] });
        assert!(parse_landmarks(&data, &ProviderOptions::default()).unwrap().is_none());

        let lenient = ProviderOptions { min_detection_confidence: 0.2 };
        assert!(parse_landmarks(&data, &lenient).unwrap().is_some());
    }

    #[test]
    fn test_empty_keypoints_is_no_detection() {
        let data = json!({ "keypoints": [] });
        assert!(parse_landmarks(&data, &ProviderOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_malformed_payload() {
        assert!(parse_landmarks(&json!({ "points": [] }), &ProviderOptions::default()).is_err());
        assert!(parse_landmarks(&json!(42), &ProviderOptions::default()).is_err());
    }

    #[tokio::test]
    async fn test_replay_loops() {
        let recording = json!([
            null,
            [{ "x": 0.5, "y": 0.5 }]
        ]);
        let provider = ReplayLandmarkProvider::from_value(&recording, &ProviderOptions::default()).unwrap();
        assert_eq!(provider.len(), 2);

        assert!(provider.detect(&frame()).await.unwrap().is_none());
        assert!(provider.detect(&frame()).await.unwrap().is_some());
        assert!(provider.detect(&frame()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replay_rejects_empty_recording() {
        assert!(ReplayLandmarkProvider::from_value(&json!([]), &ProviderOptions::default()).is_err());
        assert!(ReplayLandmarkProvider::from_value(&json!({}), &ProviderOptions::default()).is_err());
    }

    #[tokio::test]
    async fn test_null_provider() {
        let provider = NullLandmarkProvider;
        assert!(provider.detect(&frame()).await.unwrap().is_none());
        assert_eq!(provider.point_count(), BODY_LANDMARK_COUNT);
    }
}
