// Synthetic capture source producing uniformly coloured frames

use crate::models::capture::{CameraDevice, CaptureError, CaptureResult, DeviceSelector, RawFrame};
use crate::platform::capture::{resolve_device, VideoSource};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// A single virtual camera, useful for headless runs and tests
pub struct SyntheticSource {
    width: u32,
    height: u32,
    color: [u8; 3],
    frame_interval: Duration,
    frame_limit: Option<u64>,
    frames_sent: u64,
    ticker: Option<Interval>,
}

impl SyntheticSource {
    pub const DEVICE_ID: &'static str = "synthetic";

    pub fn new(width: u32, height: u32, color: [u8; 3], fps: u32) -> Self {
        Self {
            width,
            height,
            color,
            frame_interval: Duration::from_millis(1000 / fps.max(1) as u64),
            frame_limit: None,
            frames_sent: 0,
            ticker: None,
        }
    }

    /// End the stream after `limit` frames
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }
}

#[async_trait]
impl VideoSource for SyntheticSource {
    async fn list_devices(&self) -> CaptureResult<Vec<CameraDevice>> {
        Ok(vec![CameraDevice {
            id: Self::DEVICE_ID.to_string(),
            label: "Synthetic Camera".to_string(),
        }])
    }

    async fn start_capture(&mut self, selector: &DeviceSelector) -> CaptureResult<CameraDevice> {
        let devices = self.list_devices().await?;
        let device = resolve_device(&devices, selector)?.clone();

        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        self.frames_sent = 0;

        Ok(device)
    }

    async fn next_frame(&mut self) -> CaptureResult<Option<RawFrame>> {
        if self.frame_limit.map_or(false, |limit| self.frames_sent >= limit) {
            return Ok(None);
        }

        let ticker = self.ticker.as_mut().ok_or(CaptureError::NotCapturing)?;
        ticker.tick().await;

        self.frames_sent += 1;
        Ok(Some(RawFrame::filled(
            self.width,
            self.height,
            self.color,
            chrono::Utc::now().timestamp_millis(),
        )))
    }

    async fn stop_capture(&mut self) -> CaptureResult<()> {
        self.ticker = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.ticker.is_some()
    }
}
