// Camera capture sources
// Each source provides the same interface: device enumeration plus a live frame stream

pub mod image_sequence;
pub mod synthetic;

pub use image_sequence::ImageSequenceSource;
pub use synthetic::SyntheticSource;

use crate::models::capture::{CameraDevice, CaptureError, CaptureResult, DeviceSelector, RawFrame};
use async_trait::async_trait;

/// Source of live camera frames
#[async_trait]
pub trait VideoSource: Send {
    /// Get list of available camera devices
    async fn list_devices(&self) -> CaptureResult<Vec<CameraDevice>>;

    /// Open the selected device and start delivering frames
    async fn start_capture(&mut self, selector: &DeviceSelector) -> CaptureResult<CameraDevice>;

    /// Wait for the next frame. `None` once the stream has ended.
    async fn next_frame(&mut self) -> CaptureResult<Option<RawFrame>>;

    /// Stop delivering frames
    async fn stop_capture(&mut self) -> CaptureResult<()>;

    fn is_capturing(&self) -> bool;
}

/// Give unlabelled devices a readable "Camera N" label (1-based)
pub fn label_devices(devices: Vec<CameraDevice>) -> Vec<CameraDevice> {
    devices
        .into_iter()
        .enumerate()
        .map(|(i, mut device)| {
            if device.label.trim().is_empty() {
                device.label = format!("Camera {}", i + 1);
            }
            device
        })
        .collect()
}

/// Prefer a built-in camera, otherwise the first device
pub fn select_preferred_device(devices: &[CameraDevice]) -> CaptureResult<&CameraDevice> {
    devices
        .iter()
        .find(|d| {
            let label = d.label.to_lowercase();
            label.contains("integrated") || label.contains("built")
        })
        .or_else(|| devices.first())
        .ok_or(CaptureError::NoDevice)
}

/// Resolve a selector against the available devices
pub fn resolve_device<'a>(
    devices: &'a [CameraDevice],
    selector: &DeviceSelector,
) -> CaptureResult<&'a CameraDevice> {
    match selector {
        DeviceSelector::Default => select_preferred_device(devices),
        DeviceSelector::Id(id) => devices
            .iter()
            .find(|d| &d.id == id)
            .ok_or_else(|| CaptureError::DeviceNotFound(id.clone())),
    }
}
