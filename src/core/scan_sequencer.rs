// Scan sequencing - walks the part catalog on a fixed dwell cadence

use crate::models::scan::{BodyPart, ScanError, ScanPhase, ScanResult, ScanState};
use tracing::{debug, info};

/// What happened when a dwell period ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwellOutcome {
    /// `scanned` is done and `next` is now active
    Advanced { scanned: BodyPart, next: BodyPart },
    /// `scanned` was the last part
    Completed { scanned: BodyPart },
}

/// Idle -> Scanning(current_index) -> Complete, or Cancelled from any unfinished phase.
///
/// Advancement is driven only by dwell expiry and does not look at detection results.
pub struct ScanSequencer {
    catalog: &'static [BodyPart],
    state: ScanState,
    phase: ScanPhase,
    glow_increment: f32,
}

impl ScanSequencer {
    pub fn new(catalog: &'static [BodyPart], glow_increment: f32) -> Self {
        Self {
            catalog,
            state: ScanState::new(),
            phase: ScanPhase::Idle,
            glow_increment,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn catalog(&self) -> &'static [BodyPart] {
        self.catalog
    }

    /// Part currently pulsing, if scanning
    pub fn current_part(&self) -> Option<&'static BodyPart> {
        if self.phase != ScanPhase::Scanning {
            return None;
        }
        self.catalog.get(self.state.current_index)
    }

    /// Begin scanning at the first part
    pub fn start(&mut self) -> ScanResult<()> {
        match self.phase {
            ScanPhase::Idle => {
                self.phase = if self.catalog.is_empty() {
                    ScanPhase::Complete
                } else {
                    ScanPhase::Scanning
                };
                info!("Scan started with {} parts", self.catalog.len());
                Ok(())
            }
            ScanPhase::Scanning => Ok(()),
            ScanPhase::Complete | ScanPhase::Cancelled => Err(ScanError::AlreadyFinished),
        }
    }

    /// Mark the active part scanned. Returns `None` when not scanning.
    pub fn on_dwell_elapsed(&mut self) -> Option<DwellOutcome> {
        if self.phase != ScanPhase::Scanning {
            return None;
        }

        let scanned = *self.catalog.get(self.state.current_index)?;
        self.state.scanned_parts.push(scanned);
        self.state.current_index += 1;
        debug!("Scanned {} ({}/{})", scanned.name, self.state.current_index, self.catalog.len());

        match self.catalog.get(self.state.current_index) {
            Some(next) => Some(DwellOutcome::Advanced {
                scanned,
                next: *next,
            }),
            None => {
                self.phase = ScanPhase::Complete;
                info!("Scan sequence complete");
                Some(DwellOutcome::Completed { scanned })
            }
        }
    }

    /// Advance the pulse after a frame was rendered with an active part
    pub fn advance_glow(&mut self) {
        if self.current_part().is_some() {
            self.state.glow_phase += self.glow_increment;
        }
    }

    /// Abort the scan. Returns false if it had already finished.
    pub fn cancel(&mut self) -> bool {
        if self.phase.is_finished() {
            return false;
        }
        self.phase = ScanPhase::Cancelled;
        info!("Scan cancelled at part {}", self.state.current_index);
        true
    }
}
