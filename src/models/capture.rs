// Data structures for camera capture

use serde::{Deserialize, Serialize};

/// A camera that frames can be captured from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
}

/// Which camera to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Front-facing / first suitable device
    Default,
    Id(String),
}

/// A captured frame from the camera
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

impl RawFrame {
    /// Uniformly coloured frame, mostly useful for synthetic sources
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], timestamp: i64) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }

        Self {
            timestamp,
            width,
            height,
            data,
            format: PixelFormat::RGBA8,
        }
    }

    /// Red, green and blue of the pixel at (x, y)
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some(match self.format {
            PixelFormat::RGBA8 => [px[0], px[1], px[2]],
            PixelFormat::BGRA8 => [px[2], px[1], px[0]],
        })
    }
}

/// Pixel format of captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    RGBA8,
    BGRA8,
}

/// Error types for camera capture operations
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("No camera device available")]
    NoDevice,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Not currently capturing")]
    NotCapturing,
}

pub type CaptureResult<T> = Result<T, CaptureError>;
