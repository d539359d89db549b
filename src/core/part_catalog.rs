// Fixed, ordered list of body regions visited by a scan

use crate::models::pose::BodyLandmark::{self, *};
use crate::models::scan::{BodyPart, ScanError, ScanResult};

pub const PART_CATALOG: [BodyPart; 10] = [
    BodyPart { name: "Head", landmarks: &[Nose] },
    BodyPart { name: "Left Shoulder", landmarks: &[LeftShoulder] },
    BodyPart { name: "Right Shoulder", landmarks: &[RightShoulder] },
    BodyPart { name: "Left Arm", landmarks: &[LeftElbow, LeftWrist] },
    BodyPart { name: "Right Arm", landmarks: &[RightElbow, RightWrist] },
    BodyPart { name: "Waist", landmarks: &[LeftHip, RightHip] },
    BodyPart { name: "Left Leg", landmarks: &[LeftKnee, LeftAnkle] },
    BodyPart { name: "Right Leg", landmarks: &[RightKnee, RightAnkle] },
    BodyPart { name: "Left Foot", landmarks: &[LeftFootIndex] },
    BodyPart { name: "Right Foot", landmarks: &[RightFootIndex] },
];

/// Landmarks the classifiers read directly
const CLASSIFIER_LANDMARKS: [BodyLandmark; 6] = [
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    BodyLandmark::HEAD,
    BodyLandmark::FOOT,
];

pub fn catalog() -> &'static [BodyPart] {
    &PART_CATALOG
}

pub fn part_count() -> usize {
    PART_CATALOG.len()
}

/// Check every landmark the engine relies on exists in a provider's layout
pub fn validate_layout(point_count: usize) -> ScanResult<()> {
    let catalog_indices = PART_CATALOG.iter().flat_map(|part| {
        part.landmarks.iter().map(move |l| (part.name, l.index()))
    });
    let classifier_indices = CLASSIFIER_LANDMARKS.iter().map(|l| ("classifier", l.index()));

    for (owner, index) in catalog_indices.chain(classifier_indices) {
        if index >= point_count {
            return Err(ScanError::LandmarkLayout(format!(
                "{} needs landmark {} but the provider reports {} points",
                owner, index, point_count
            )));
        }
    }

    Ok(())
}
