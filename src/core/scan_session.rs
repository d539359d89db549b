// Scan session - joins the frame pump and the dwell timer on a single event consumer
//
// Frame pump:   VideoSource -> LandmarkProvider -> ScanEvent::Frame
// Dwell timer:  start delay, then one ScanEvent::DwellElapsed per dwell period
// Consumer:     owns the sequencer, the retained landmarks and the last frame

use crate::core::body_type::BodyTypeClassifier;
use crate::core::config::ScanConfig;
use crate::core::overlay_renderer::OverlayRenderer;
use crate::core::part_catalog::{self, catalog};
use crate::core::scan_sequencer::{DwellOutcome, ScanSequencer};
use crate::core::session_reporter::{ReportOutcome, SessionBackend, SessionReporter};
use crate::core::skin_tone::SkinToneSampler;
use crate::models::capture::{DeviceSelector, RawFrame};
use crate::models::classification::ClassificationResult;
use crate::models::pose::{LandmarkSet, RetainedLandmarks};
use crate::models::scan::{ScanError, ScanPhase, ScanResult, ScanUpdate};
use crate::models::session::SessionContext;
use crate::platform::capture::VideoSource;
use crate::platform::pose::LandmarkProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Inputs to the session's event loop
#[derive(Debug)]
pub enum ScanEvent {
    /// Start delay over, begin the first dwell period
    Started,
    Frame {
        frame: RawFrame,
        landmarks: Option<LandmarkSet>,
    },
    DwellElapsed,
    Cancel,
}

/// Lets other tasks abort a running scan
#[derive(Clone)]
pub struct ScanHandle {
    events: mpsc::Sender<ScanEvent>,
}

impl ScanHandle {
    /// Abort the scan. It ends as Cancelled, without classification or report.
    pub async fn cancel(&self) -> ScanResult<()> {
        self.events
            .send(ScanEvent::Cancel)
            .await
            .map_err(|_| ScanError::ChannelClosed)
    }
}

/// How a scan ended
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub session_id: String,
    pub phase: ScanPhase,
    pub result: Option<ClassificationResult>,
    pub report: Option<ReportOutcome>,
    pub frames_processed: u64,
}

pub struct ScanSession<B: SessionBackend> {
    config: ScanConfig,
    context: SessionContext,
    provider: Arc<dyn LandmarkProvider>,
    sequencer: ScanSequencer,
    renderer: OverlayRenderer,
    skin_sampler: SkinToneSampler,
    body_classifier: BodyTypeClassifier,
    reporter: SessionReporter<B>,
    events_tx: mpsc::Sender<ScanEvent>,
    events_rx: mpsc::Receiver<ScanEvent>,
    updates: Option<mpsc::Sender<ScanUpdate>>,
    last_frame: Option<Arc<RawFrame>>,
    retained: Option<RetainedLandmarks>,
    frame_index: u64,
}

impl<B: SessionBackend + 'static> ScanSession<B> {
    /// Create a session. Fails if the provider's landmark layout lacks a point the scan needs.
    pub fn new(
        config: ScanConfig,
        context: SessionContext,
        provider: Arc<dyn LandmarkProvider>,
        reporter: SessionReporter<B>,
    ) -> ScanResult<Self> {
        part_catalog::validate_layout(provider.point_count())?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            sequencer: ScanSequencer::new(catalog(), config.glow_increment),
            renderer: OverlayRenderer::from_config(&config),
            skin_sampler: SkinToneSampler::new(config.skin_sample_half_width),
            body_classifier: BodyTypeClassifier::new(
                config.reference_frame_height,
                config.reference_height_cm,
            ),
            config,
            context,
            provider,
            reporter,
            events_tx,
            events_rx,
            updates: None,
            last_frame: None,
            retained: None,
            frame_index: 0,
        })
    }

    /// Publish progress to `updates`. Updates are dropped, not queued, when the receiver lags.
    pub fn with_updates(mut self, updates: mpsc::Sender<ScanUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn handle(&self) -> ScanHandle {
        ScanHandle {
            events: self.events_tx.clone(),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Open the camera and run the scan to completion or cancellation.
    ///
    /// Only a capture failure while opening the camera is an error.
    pub async fn run(
        mut self,
        mut source: Box<dyn VideoSource>,
        selector: DeviceSelector,
    ) -> ScanResult<ScanOutcome> {
        let device = source.start_capture(&selector).await?;
        info!(
            "Session {} scanning with camera '{}' ({})",
            self.context.session_id,
            device.label,
            self.provider.get_model_info()
        );

        self.publish(ScanUpdate::Status("Preparing camera".to_string()));

        let (stop_tx, stop_rx) = watch::channel(false);
        let pump = Self::spawn_frame_pump(
            source,
            self.provider.clone(),
            self.events_tx.clone(),
            stop_rx,
        );
        let timer = Self::spawn_dwell_timer(
            Duration::from_millis(self.config.start_delay_ms),
            Duration::from_millis(self.config.dwell_ms),
            self.sequencer.catalog().len(),
            self.events_tx.clone(),
        );

        let outcome = self.event_loop().await;

        timer.abort();

        // Let the pump release the camera before returning
        let _ = stop_tx.send(true);
        if let Err(e) = pump.await {
            warn!("Frame pump ended abnormally: {}", e);
        }

        outcome
    }

    // ==============================================================================
    // Producers
    // ==============================================================================

    fn spawn_frame_pump(
        mut source: Box<dyn VideoSource>,
        provider: Arc<dyn LandmarkProvider>,
        events: mpsc::Sender<ScanEvent>,
        mut stop: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = stop.changed() => break,
                    next = source.next_frame() => next,
                };
                let frame = match next {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        debug!("Camera stream ended");
                        break;
                    }
                    Err(e) => {
                        warn!("Camera stopped delivering frames: {}", e);
                        break;
                    }
                };

                let landmarks = match provider.detect(&frame).await {
                    Ok(landmarks) => landmarks,
                    Err(e) => {
                        warn!("Landmark detection failed, skipping frame: {}", e);
                        None
                    }
                };

                tokio::select! {
                    _ = stop.changed() => break,
                    sent = events.send(ScanEvent::Frame { frame, landmarks }) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }

            if let Err(e) = source.stop_capture().await {
                warn!("Failed to stop camera: {}", e);
            }
        })
    }

    fn spawn_dwell_timer(
        start_delay: Duration,
        dwell: Duration,
        part_count: usize,
        events: mpsc::Sender<ScanEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(start_delay).await;
            if events.send(ScanEvent::Started).await.is_err() {
                return;
            }

            // Deadlines are fixed from the start, so slow handling does not stretch the scan
            let mut ticker = tokio::time::interval_at(Instant::now() + dwell, dwell);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            for _ in 0..part_count {
                ticker.tick().await;
                if events.send(ScanEvent::DwellElapsed).await.is_err() {
                    return;
                }
            }
        })
    }

    // ==============================================================================
    // Consumer
    // ==============================================================================

    async fn event_loop(&mut self) -> ScanResult<ScanOutcome> {
        while let Some(event) = self.events_rx.recv().await {
            match event {
                ScanEvent::Started => {
                    self.sequencer.start()?;
                    match self.sequencer.current_part() {
                        Some(part) => self.publish(ScanUpdate::Status(format!("Scanning {}...", part.name))),
                        None => return Ok(self.complete().await),
                    }
                }
                ScanEvent::Frame { frame, landmarks } => self.on_frame(frame, landmarks),
                ScanEvent::DwellElapsed => {
                    if let Some(outcome) = self.on_dwell_elapsed().await {
                        return Ok(outcome);
                    }
                }
                ScanEvent::Cancel => {
                    if self.sequencer.cancel() {
                        self.publish(ScanUpdate::Cancelled);
                        return Ok(self.outcome(None, None));
                    }
                }
            }
        }

        // The session holds a sender, so the channel cannot close under us
        Err(ScanError::ChannelClosed)
    }

    fn on_frame(&mut self, frame: RawFrame, landmarks: Option<LandmarkSet>) {
        self.frame_index += 1;
        let frame = Arc::new(frame);

        if let Some(landmarks) = landmarks {
            if self.sequencer.current_part().is_some() {
                let overlay = self.renderer.render(
                    self.sequencer.state(),
                    self.sequencer.catalog(),
                    &landmarks,
                    frame.width,
                    frame.height,
                );
                self.publish(ScanUpdate::Overlay {
                    frame_index: self.frame_index,
                    frame: frame.clone(),
                    overlay,
                });
                self.sequencer.advance_glow();
            }

            self.retained = Some(RetainedLandmarks {
                landmarks,
                frame_index: self.frame_index,
                timestamp: frame.timestamp,
            });
        }

        self.last_frame = Some(frame);
    }

    async fn on_dwell_elapsed(&mut self) -> Option<ScanOutcome> {
        match self.sequencer.on_dwell_elapsed()? {
            DwellOutcome::Advanced { scanned, next } => {
                self.publish(ScanUpdate::PartScanned {
                    name: scanned.name,
                    index: self.sequencer.state().current_index - 1,
                });
                self.publish(ScanUpdate::Status(format!("Scanning {}...", next.name)));
                None
            }
            DwellOutcome::Completed { scanned } => {
                self.publish(ScanUpdate::PartScanned {
                    name: scanned.name,
                    index: self.sequencer.state().current_index - 1,
                });
                Some(self.complete().await)
            }
        }
    }

    async fn complete(&mut self) -> ScanOutcome {
        self.publish(ScanUpdate::Status("Scanning complete!".to_string()));

        let result = self.classify();
        self.publish(ScanUpdate::Completed(result));

        let report = self.reporter.report(&self.context, &result).await;
        if let Some(failure) = &report.failure {
            self.publish(ScanUpdate::Status(format!("Could not save session: {}", failure)));
        }

        self.outcome(Some(result), Some(report))
    }

    /// Classify from the retained landmarks and the last frame received
    fn classify(&self) -> ClassificationResult {
        let now = chrono::Utc::now().timestamp_millis();

        let landmarks = match &self.retained {
            Some(retained) if retained.is_stale(now, self.config.max_landmark_age_ms) => {
                warn!(
                    "Discarding landmarks from frame {} ({} ms old)",
                    retained.frame_index,
                    retained.age_ms(now)
                );
                None
            }
            Some(retained) => {
                debug!(
                    "Classifying from frame {} ({} ms old)",
                    retained.frame_index,
                    retained.age_ms(now)
                );
                Some(&retained.landmarks)
            }
            None => {
                info!("No landmarks observed during scan");
                None
            }
        };

        let frame = self.last_frame.as_deref();
        let frame_height = frame.map(|f| f.height).unwrap_or(self.config.frame_height);

        let skin_tone = self.skin_sampler.classify(landmarks, frame);
        let (body_type, height_cm) = self.body_classifier.classify(landmarks, frame_height);

        let result = ClassificationResult {
            skin_tone,
            body_type,
            height_cm,
        };
        info!(
            "Classification: skin tone {}, body type {}, height {} cm",
            result.skin_tone.to_string(),
            result.body_type.to_string(),
            result.height_label()
        );
        result
    }

    fn outcome(&self, result: Option<ClassificationResult>, report: Option<ReportOutcome>) -> ScanOutcome {
        ScanOutcome {
            session_id: self.context.session_id.clone(),
            phase: self.sequencer.phase(),
            result,
            report,
            frames_processed: self.frame_index,
        }
    }

    fn publish(&self, update: ScanUpdate) {
        let updates = match &self.updates {
            Some(tx) => tx,
            None => return,
        };

        match updates.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => {
                debug!("Update receiver lagging, dropped {:?}", std::mem::discriminant(&update));
            }
            Err(TrySendError::Closed(_)) => {
                error!("Update receiver closed");
            }
        }
    }
}
