// Classification results derived once a scan completes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkinTone {
    Light,
    #[serde(rename = "Mid-light")]
    MidLight,
    #[serde(rename = "Mid-dark")]
    MidDark,
    Dark,
    Unknown,
}

impl SkinTone {
    pub fn to_string(&self) -> &'static str {
        match self {
            SkinTone::Light => "Light",
            SkinTone::MidLight => "Mid-light",
            SkinTone::MidDark => "Mid-dark",
            SkinTone::Dark => "Dark",
            SkinTone::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    Rectangle,
    #[serde(rename = "Inverted Triangle")]
    InvertedTriangle,
    Triangle,
    Hourglass,
    Unknown,
}

impl BodyType {
    pub fn to_string(&self) -> &'static str {
        match self {
            BodyType::Rectangle => "Rectangle",
            BodyType::InvertedTriangle => "Inverted Triangle",
            BodyType::Triangle => "Triangle",
            BodyType::Hourglass => "Hourglass",
            BodyType::Unknown => "Unknown",
        }
    }
}

/// Normalized body widths and span used for shape classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMeasurements {
    pub shoulder_width: f32,
    pub hip_width: f32,
    /// Derived from shoulders and hips, not measured
    pub waist_width: f32,
    /// Head to foot distance, if both points were present
    pub vertical_span: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub skin_tone: SkinTone,
    pub body_type: BodyType,
    /// Rounded to two decimals
    pub height_cm: f32,
}

impl ClassificationResult {
    pub fn unknown() -> Self {
        Self {
            skin_tone: SkinTone::Unknown,
            body_type: BodyType::Unknown,
            height_cm: 0.0,
        }
    }

    /// Height with exactly two decimals, as reported to the backend
    pub fn height_label(&self) -> String {
        format!("{:.2}", self.height_cm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_serialized_names() {
        let json = serde_json::to_string(&SkinTone::MidLight).unwrap();
        assert_eq!(json, "\"Mid-light\"");
        let json = serde_json::to_string(&BodyType::InvertedTriangle).unwrap();
        assert_eq!(json, format!("\"{}\"", BodyType::InvertedTriangle.to_string()));
    }

    #[test]
    fn test_height_label() {
        let mut result = ClassificationResult::unknown();
        assert_eq!(result.height_label(), "0.00");
        result.height_cm = 85.0;
        assert_eq!(result.height_label(), "85.00");
    }
}
