// Overlay rendering - per-part highlight boxes derived from landmark geometry

use crate::core::config::ScanConfig;
use crate::models::capture::{PixelFormat, RawFrame};
use crate::models::overlay::{Overlay, OverlayBox, PixelRect};
use crate::models::pose::LandmarkSet;
use crate::models::scan::{BodyPart, ScanState};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, Blend};
use imageproc::rect::Rect;

/// Stroke alpha for parts that are already scanned
const SCANNED_ALPHA: f32 = 0.8;
/// Vertical distance of the label above the part's top edge
const LABEL_OFFSET_PX: f32 = 20.0;
const LINE_WIDTH: u32 = 3;
const STROKE_COLOR: [u8; 3] = [0, 255, 0];

/// Pulse intensity of the active part for a given glow phase
pub fn glow_alpha(glow_phase: f32) -> f32 {
    0.5 + 0.5 * glow_phase.sin()
}

pub struct OverlayRenderer {
    margin: f32,
}

impl OverlayRenderer {
    pub fn new(margin: f32) -> Self {
        Self { margin }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.box_margin_px)
    }

    /// Box for one part, or `None` when none of its landmarks are present
    pub fn part_box(
        &self,
        part: &BodyPart,
        landmarks: &LandmarkSet,
        width: u32,
        height: u32,
        alpha: f32,
        active: bool,
    ) -> Option<OverlayBox> {
        let mut points = part
            .indices()
            .filter_map(|i| landmarks.point(i))
            .map(|p| p.to_pixel(width, height));

        let (first_x, first_y) = points.next()?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first_x, first_x, first_y, first_y);
        for (x, y) in points {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        let bounds = PixelRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        };
        let rect = PixelRect {
            x: min_x - self.margin,
            y: min_y - self.margin,
            width: bounds.width + 2.0 * self.margin,
            height: bounds.height + 2.0 * self.margin,
        };

        Some(OverlayBox {
            label: part.name.to_string(),
            bounds,
            rect,
            label_anchor: (min_x, min_y - LABEL_OFFSET_PX),
            alpha,
            active,
        })
    }

    /// Boxes for every scanned part plus the pulsing active part
    pub fn render(
        &self,
        state: &ScanState,
        catalog: &[BodyPart],
        landmarks: &LandmarkSet,
        width: u32,
        height: u32,
    ) -> Overlay {
        let mut boxes: Vec<OverlayBox> = state
            .scanned_parts
            .iter()
            .filter_map(|part| self.part_box(part, landmarks, width, height, SCANNED_ALPHA, false))
            .collect();

        if let Some(active) = catalog.get(state.current_index) {
            let alpha = glow_alpha(state.glow_phase);
            if let Some(b) = self.part_box(active, landmarks, width, height, alpha, true) {
                boxes.push(b);
            }
        }

        Overlay {
            frame_width: width,
            frame_height: height,
            boxes,
        }
    }
}

/// Convert a captured frame into an RGBA image
pub fn frame_to_image(frame: &RawFrame) -> Option<RgbaImage> {
    let mut data = frame.data.clone();
    if frame.format == PixelFormat::BGRA8 {
        for px in data.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
    }
    RgbaImage::from_raw(frame.width, frame.height, data)
}

/// Stroke every overlay box onto `image`, blending with the existing pixels.
///
/// Labels are carried as anchors in the overlay and are not rasterized here.
pub fn draw_overlay(image: &mut RgbaImage, overlay: &Overlay) {
    let mut canvas = Blend(std::mem::replace(image, RgbaImage::new(0, 0)));
    let half = (LINE_WIDTH / 2) as i32;

    for b in &overlay.boxes {
        let alpha = (b.alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        let color = Rgba([STROKE_COLOR[0], STROKE_COLOR[1], STROKE_COLOR[2], alpha]);
        for ring in -half..=(LINE_WIDTH as i32 - 1 - half) {
            let x0 = b.rect.x.round() as i32 - ring;
            let y0 = b.rect.y.round() as i32 - ring;
            let x1 = b.rect.right().round() as i32 + ring;
            let y1 = b.rect.bottom().round() as i32 + ring;
            if x1 < x0 || y1 < y0 {
                continue;
            }
            let rect = Rect::at(x0, y0).of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }

    *image = canvas.0;
}
