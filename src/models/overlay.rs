// Overlay geometry produced for each rendered frame

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// One highlighted body part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayBox {
    pub label: String,
    /// Tight bounds of the part's points, before the margin is applied
    pub bounds: PixelRect,
    /// Stroked rectangle, `bounds` grown by the margin on every side
    pub rect: PixelRect,
    pub label_anchor: (f32, f32),
    pub alpha: f32,
    pub active: bool,
}

/// Everything to draw over one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub frame_width: u32,
    pub frame_height: u32,
    pub boxes: Vec<OverlayBox>,
}

impl Overlay {
    pub fn active_box(&self) -> Option<&OverlayBox> {
        self.boxes.iter().find(|b| b.active)
    }
}
