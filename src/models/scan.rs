// Data models for the guided scan: catalog entries, progress state and updates

use crate::models::capture::{CaptureError, RawFrame};
use crate::models::classification::ClassificationResult;
use crate::models::overlay::Overlay;
use crate::models::pose::BodyLandmark;
use serde::Serialize;
use std::sync::Arc;

/// A named body region and the landmarks that outline it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyPart {
    pub name: &'static str,
    pub landmarks: &'static [BodyLandmark],
}

impl BodyPart {
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.landmarks.iter().map(|l| l.index())
    }
}

/// Lifecycle of one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Idle,
    Scanning,
    Complete,
    Cancelled,
}

impl ScanPhase {
    pub fn to_string(&self) -> &'static str {
        match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Scanning => "scanning",
            ScanPhase::Complete => "complete",
            ScanPhase::Cancelled => "cancelled",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ScanPhase::Complete | ScanPhase::Cancelled)
    }
}

/// Progress of the sequencer through the part catalog.
///
/// `scanned_parts` is always the catalog prefix of length `current_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanState {
    pub scanned_parts: Vec<BodyPart>,
    pub current_index: usize,
    pub glow_phase: f32,
}

impl ScanState {
    pub fn new() -> Self {
        Self {
            scanned_parts: Vec::new(),
            current_index: 0,
            glow_phase: 0.0,
        }
    }
}

impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}

/// Notifications published by a running scan session
#[derive(Debug, Clone)]
pub enum ScanUpdate {
    /// Operator-facing status line
    Status(String),
    PartScanned { name: &'static str, index: usize },
    /// Overlay for a rendered frame
    Overlay {
        frame_index: u64,
        frame: Arc<RawFrame>,
        overlay: Overlay,
    },
    Completed(ClassificationResult),
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Landmark layout mismatch: {0}")]
    LandmarkLayout(String),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Scan already finished")]
    AlreadyFinished,

    #[error("Event channel closed before the scan finished")]
    ChannelClosed,
}

pub type ScanResult<T> = Result<T, ScanError>;
