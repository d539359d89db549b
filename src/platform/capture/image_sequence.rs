// Image sequence capture source
// Each subdirectory of the root is a camera; its PNG/JPEG files are the frame stream

use crate::models::capture::{CameraDevice, CaptureError, CaptureResult, DeviceSelector, PixelFormat, RawFrame};
use crate::platform::capture::{label_devices, resolve_device, VideoSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub struct ImageSequenceSource {
    root: PathBuf,
    frame_interval: Duration,
    looping: bool,
    frames: Vec<PathBuf>,
    cursor: usize,
    ticker: Option<Interval>,
}

impl ImageSequenceSource {
    pub fn new(root: impl Into<PathBuf>, fps: u32) -> Self {
        Self {
            root: root.into(),
            frame_interval: Duration::from_millis(1000 / fps.max(1) as u64),
            looping: true,
            frames: Vec::new(),
            cursor: 0,
            ticker: None,
        }
    }

    /// End the stream after the last image instead of starting over
    pub fn without_looping(mut self) -> Self {
        self.looping = false;
        self
    }

    fn is_frame_file(path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
    }

    /// Sorted frame files directly inside `dir`
    fn frame_files(dir: &Path) -> CaptureResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| Self::is_frame_file(p))
            .collect();
        files.sort();
        Ok(files)
    }

    fn device_dir(&self, device: &CameraDevice) -> PathBuf {
        if device.id == "." {
            self.root.clone()
        } else {
            self.root.join(&device.id)
        }
    }

    async fn decode(path: PathBuf) -> CaptureResult<RawFrame> {
        let display = path.display().to_string();
        let image = tokio::task::spawn_blocking(move || image::open(&path).map(|img| img.to_rgba8()))
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?
            .map_err(|e| CaptureError::CaptureFailed(format!("Failed to decode {}: {}", display, e)))?;

        Ok(RawFrame {
            timestamp: chrono::Utc::now().timestamp_millis(),
            width: image.width(),
            height: image.height(),
            data: image.into_raw(),
            format: PixelFormat::RGBA8,
        })
    }
}

fn io_error(path: &Path, e: std::io::Error) -> CaptureError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied(path.display().to_string()),
        _ => CaptureError::CaptureFailed(format!("{}: {}", path.display(), e)),
    }
}

#[async_trait]
impl VideoSource for ImageSequenceSource {
    async fn list_devices(&self) -> CaptureResult<Vec<CameraDevice>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| io_error(&self.root, e))?;

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        let mut devices = Vec::new();
        for dir in dirs {
            if Self::frame_files(&dir)?.is_empty() {
                continue;
            }
            let id = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            // Names starting with '_' are treated as unlabelled
            let label = if id.starts_with('_') {
                String::new()
            } else {
                id.replace(['_', '-'], " ")
            };
            devices.push(CameraDevice { id, label });
        }

        // A root holding frames directly is a single camera
        if devices.is_empty() && !Self::frame_files(&self.root)?.is_empty() {
            devices.push(CameraDevice {
                id: ".".to_string(),
                label: String::new(),
            });
        }

        Ok(label_devices(devices))
    }

    async fn start_capture(&mut self, selector: &DeviceSelector) -> CaptureResult<CameraDevice> {
        let devices = self.list_devices().await?;
        let device = resolve_device(&devices, selector)?.clone();

        self.frames = Self::frame_files(&self.device_dir(&device))?;
        self.cursor = 0;

        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);

        info!("Opened camera '{}' with {} frames", device.label, self.frames.len());
        Ok(device)
    }

    async fn next_frame(&mut self) -> CaptureResult<Option<RawFrame>> {
        let ticker = self.ticker.as_mut().ok_or(CaptureError::NotCapturing)?;

        if self.cursor >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Ok(None);
            }
            self.cursor = 0;
        }

        ticker.tick().await;

        let path = self.frames[self.cursor].clone();
        self.cursor += 1;
        debug!("Reading frame {}", path.display());

        Self::decode(path).await.map(Some)
    }

    async fn stop_capture(&mut self) -> CaptureResult<()> {
        self.ticker = None;
        self.frames.clear();
        self.cursor = 0;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.ticker.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("hautfit_frames_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    fn write_frame(path: &Path, rgb: [u8; 3]) {
        let image = image::RgbaImage::from_pixel(4, 3, image::Rgba([rgb[0], rgb[1], rgb[2], 255]));
        image.save(path).unwrap();
    }

    #[tokio::test]
    async fn test_devices_from_subdirectories() {
        let root = temp_root("devices");
        for dir in ["usb_cam", "integrated_webcam", "_0", "empty"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        write_frame(&root.join("usb_cam/0001.png"), [1, 1, 1]);
        write_frame(&root.join("integrated_webcam/0001.png"), [2, 2, 2]);
        write_frame(&root.join("_0/0001.png"), [3, 3, 3]);

        let source = ImageSequenceSource::new(&root, 30);
        let devices = source.list_devices().await.unwrap();
        let labels: Vec<&str> = devices.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["Camera 1", "integrated webcam", "usb cam"]);

        let mut source = source;
        let device = source.start_capture(&DeviceSelector::Default).await.unwrap();
        assert_eq!(device.id, "integrated_webcam");

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_empty_root_has_no_device() {
        let root = temp_root("empty");
        let mut source = ImageSequenceSource::new(&root, 30);
        assert!(source.list_devices().await.unwrap().is_empty());
        assert!(matches!(
            source.start_capture(&DeviceSelector::Default).await,
            Err(CaptureError::NoDevice)
        ));
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_frames_in_order_then_loop() {
        let root = temp_root("order");
        write_frame(&root.join("0002.png"), [20, 20, 20]);
        write_frame(&root.join("0001.png"), [10, 10, 10]);
        std::fs::write(root.join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::new(&root, 1000);
        source.start_capture(&DeviceSelector::Default).await.unwrap();

        let first = source.next_frame().await.unwrap().unwrap();
        assert_eq!((first.width, first.height), (4, 3));
        assert_eq!(first.rgb_at(0, 0), Some([10, 10, 10]));
        let second = source.next_frame().await.unwrap().unwrap();
        assert_eq!(second.rgb_at(3, 2), Some([20, 20, 20]));
        let third = source.next_frame().await.unwrap().unwrap();
        assert_eq!(third.rgb_at(0, 0), Some([10, 10, 10]));

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_stream_ends_without_looping() {
        let root = temp_root("once");
        write_frame(&root.join("0001.png"), [5, 5, 5]);

        let mut source = ImageSequenceSource::new(&root, 1000).without_looping();
        assert!(matches!(source.next_frame().await, Err(CaptureError::NotCapturing)));

        source.start_capture(&DeviceSelector::Default).await.unwrap();
        assert!(source.next_frame().await.unwrap().is_some());
        assert!(source.next_frame().await.unwrap().is_none());

        source.stop_capture().await.unwrap();
        assert!(!source.is_capturing());
        std::fs::remove_dir_all(&root).ok();
    }
}
