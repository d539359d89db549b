// Skin tone sampling around the head landmark

use crate::models::capture::RawFrame;
use crate::models::classification::SkinTone;
use crate::models::pose::{BodyLandmark, LandmarkSet};
use tracing::debug;

/// Bucket a mean brightness (0-255) into a tone category
pub fn bucket_brightness(brightness: f32) -> SkinTone {
    if brightness > 180.0 {
        SkinTone::Light
    } else if brightness > 130.0 {
        SkinTone::MidLight
    } else if brightness > 80.0 {
        SkinTone::MidDark
    } else {
        SkinTone::Dark
    }
}

/// Brightness of a mean colour, with each channel mean already floored
pub fn brightness_of(mean_rgb: [u32; 3]) -> f32 {
    (mean_rgb[0] + mean_rgb[1] + mean_rgb[2]) as f32 / 3.0
}

pub struct SkinToneSampler {
    half_width: u32,
}

impl SkinToneSampler {
    pub fn new(half_width: u32) -> Self {
        Self { half_width }
    }

    /// Classify the tone around the head, or `Unknown` without a usable head point or frame
    pub fn classify(&self, landmarks: Option<&LandmarkSet>, frame: Option<&RawFrame>) -> SkinTone {
        let (head, frame) = match (landmarks.and_then(|l| l.get(BodyLandmark::HEAD)), frame) {
            (Some(head), Some(frame)) => (head, frame),
            _ => return SkinTone::Unknown,
        };

        let (px, py) = head.to_pixel(frame.width, frame.height);
        match self.mean_rgb(frame, px.floor() as i64, py.floor() as i64) {
            Some(mean) => {
                let brightness = brightness_of(mean);
                let tone = bucket_brightness(brightness);
                debug!("Skin sample mean {:?}, brightness {:.1} -> {}", mean, brightness, tone.to_string());
                tone
            }
            None => SkinTone::Unknown,
        }
    }

    /// Floored mean colour of the square around (cx, cy), clamped to the frame.
    /// `None` if the clamped region is empty.
    pub fn mean_rgb(&self, frame: &RawFrame, cx: i64, cy: i64) -> Option<[u32; 3]> {
        let half = self.half_width as i64;
        let x0 = (cx - half).max(0);
        let y0 = (cy - half).max(0);
        let x1 = (cx + half).min(frame.width as i64);
        let y1 = (cy + half).min(frame.height as i64);

        let mut sum = [0u64; 3];
        let mut count = 0u64;
        for y in y0..y1 {
            for x in x0..x1 {
                if let Some(rgb) = frame.rgb_at(x as u32, y as u32) {
                    sum[0] += rgb[0] as u64;
                    sum[1] += rgb[1] as u64;
                    sum[2] += rgb[2] as u64;
                    count += 1;
                }
            }
        }

        if count == 0 {
            return None;
        }

        Some([
            (sum[0] / count) as u32,
            (sum[1] / count) as u32,
            (sum[2] / count) as u32,
        ])
    }
}
