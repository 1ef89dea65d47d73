// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture session — owns the live video source, runs the periodic detection
// loop, and turns a user-triggered capture into a finished page.
//
// Lifecycle:
//
//   Idle -> Starting -> Live <-> Capturing
//                 \               |
//                  \-> (denied)   +-> Stopped
//
// A session whose camera could not be opened stays in `Starting`; every
// capture on it returns `Ok(None)`. The video source is released on `stop()`
// and, as a backstop, when the session is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use scanwerk_bridge::{CAMERA_CONSENT_KEY, CameraAccess, ConsentStore, VideoSource};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{ScannerConfig, SessionId, SessionState};
use scanwerk_document::{
    CapturePipeline, DetectionOutcome, DocumentDetector, PageArtifact, Quadrilateral, WorkingFrame,
};

use crate::stability::{DetectionSnapshot, StabilityGate, StabilityState};

/// Detection results shared between the loop and `capture()`.
///
/// Only ever locked for a read or a write, never across a grab or analysis.
#[derive(Debug)]
struct DetectionCache {
    gate: StabilityGate,
    last_outcome: DetectionOutcome,
    /// Last `Found` outline in full-resolution coordinates.
    last_found: Option<Quadrilateral>,
}

impl DetectionCache {
    fn new(threshold: u32) -> Self {
        Self {
            gate: StabilityGate::new(threshold),
            last_outcome: DetectionOutcome::NotFound,
            last_found: None,
        }
    }

    fn clear(&mut self) {
        self.gate.reset();
        self.last_outcome = DetectionOutcome::NotFound;
        self.last_found = None;
    }
}

/// Everything one detection tick needs. Shared with the loop task.
struct DetectionContext {
    session_id: SessionId,
    source: Arc<dyn VideoSource>,
    detector: DocumentDetector,
    analysis_max_width: u32,
    cache: Arc<Mutex<DetectionCache>>,
    snapshots: Arc<watch::Sender<DetectionSnapshot>>,
}

impl DetectionContext {
    /// Grab the current frame, analyse a downscaled copy, and publish the
    /// result. Returns `None` if no frame could be obtained.
    fn tick(&self) -> Option<StabilityState> {
        let frame = match self.source.grab() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(session_id = %self.session_id, "no frame yet; tick skipped");
                return None;
            }
            Err(e) => {
                debug!(session_id = %self.session_id, error = %e, "frame grab failed; tick skipped");
                return None;
            }
        };

        let working = WorkingFrame::prepare(&frame, self.analysis_max_width);
        let outcome = working.to_source(self.detector.analyze(working.image()));

        let (state, snapshot) = {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            let state = cache.gate.update(&outcome);
            cache.last_outcome = outcome;
            if let DetectionOutcome::Found(quad) = outcome {
                cache.last_found = Some(quad);
            }
            (state, cache.gate.snapshot())
        };

        self.snapshots.send_replace(snapshot);
        Some(state)
    }
}

/// Clears the in-flight flag and returns the session to `Live` however the
/// capture ends.
struct CaptureGuard<'a> {
    in_flight: &'a AtomicBool,
    state: &'a Mutex<SessionState>,
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == SessionState::Capturing {
            *state = SessionState::Live;
        }
        self.in_flight.store(false, Ordering::Release);
    }
}

/// One live scanning session.
///
/// The session exclusively owns its video source; callers interact only
/// through [`start`](Self::start), [`capture`](Self::capture) and
/// [`stop`](Self::stop).
pub struct CaptureSession {
    id: SessionId,
    config: ScannerConfig,
    camera: Arc<dyn CameraAccess>,
    consent: Arc<dyn ConsentStore>,
    state: Mutex<SessionState>,
    source: Option<Arc<dyn VideoSource>>,
    context: Option<Arc<DetectionContext>>,
    cache: Arc<Mutex<DetectionCache>>,
    snapshots: Arc<watch::Sender<DetectionSnapshot>>,
    pipeline: Arc<CapturePipeline>,
    capture_in_flight: AtomicBool,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Create an idle session. Nothing is opened until [`start`](Self::start).
    pub fn new(
        config: ScannerConfig,
        camera: Arc<dyn CameraAccess>,
        consent: Arc<dyn ConsentStore>,
    ) -> Self {
        let (snapshots, _) = watch::channel(DetectionSnapshot::default());
        Self {
            id: SessionId::new(),
            cache: Arc::new(Mutex::new(DetectionCache::new(
                config.session.stability_threshold,
            ))),
            pipeline: Arc::new(CapturePipeline::new(&config)),
            config,
            camera,
            consent,
            state: Mutex::new(SessionState::Idle),
            source: None,
            context: None,
            snapshots: Arc::new(snapshots),
            capture_in_flight: AtomicBool::new(false),
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!(session_id = %self.id, from = ?*state, to = ?next, "session state change");
        *state = next;
    }

    /// Whether a camera stream is currently open.
    pub fn camera_available(&self) -> bool {
        self.source.is_some()
    }

    pub fn stability(&self) -> StabilityState {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).gate.state()
    }

    pub fn last_outcome(&self) -> DetectionOutcome {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).last_outcome
    }

    /// Receive every published detection snapshot (for the overlay and the
    /// "hold steady" hint).
    pub fn subscribe(&self) -> watch::Receiver<DetectionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Request the camera and begin live detection.
    ///
    /// Only acts from `Idle`. A denied or missing camera is not an error: the
    /// session logs it and stays in `Starting`.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn start(&mut self) -> SessionState {
        let current = self.state();
        if current != SessionState::Idle {
            debug!(state = ?current, "start ignored");
            return current;
        }
        self.set_state(SessionState::Starting);

        let on_record = match self.consent.is_granted(CAMERA_CONSENT_KEY) {
            Ok(granted) => granted,
            Err(e) => {
                warn!(error = %e, "consent lookup failed; asking again");
                false
            }
        };

        let camera = Arc::clone(&self.camera);
        let opened = tokio::task::spawn_blocking(move || camera.open(on_record))
            .await
            .unwrap_or_else(|e| Err(ScanwerkError::Session(format!("camera open task: {e}"))));

        let source = match opened {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "camera unavailable; capture is not possible in this session");
                return self.state();
            }
        };

        if !on_record {
            if let Err(e) = self
                .consent
                .grant(CAMERA_CONSENT_KEY, self.config.session.consent_ttl())
            {
                warn!(error = %e, "could not record camera consent");
            }
        }

        let context = Arc::new(DetectionContext {
            session_id: self.id,
            source: Arc::clone(&source),
            detector: DocumentDetector::new(self.config.detection.clone()),
            analysis_max_width: self.config.session.analysis_max_width,
            cache: Arc::clone(&self.cache),
            snapshots: Arc::clone(&self.snapshots),
        });

        let shutdown = Arc::clone(&self.shutdown_signal);
        let period = self.config.session.tick_interval();
        let loop_context = Arc::clone(&context);
        self.task_handle = Some(tokio::spawn(async move {
            Self::detection_loop(loop_context, shutdown, period).await;
        }));

        self.source = Some(source);
        self.context = Some(context);
        self.set_state(SessionState::Live);
        info!(consent_on_record = on_record, "capture session live");
        SessionState::Live
    }

    /// Runs one detection tick right now, on the calling thread.
    ///
    /// Returns `None` when there is no open source or no frame to analyse.
    pub fn poll_detection(&self) -> Option<StabilityState> {
        self.context.as_ref()?.tick()
    }

    /// Best-effort periodic detection. A tick that overruns the period causes
    /// the missed ticks to be skipped, never queued.
    async fn detection_loop(
        context: Arc<DetectionContext>,
        shutdown: Arc<Notify>,
        period: Duration,
    ) {
        // `interval` panics on a zero period.
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!(session_id = %context.session_id, "detection loop received shutdown signal");
                    break;
                }

                _ = interval.tick() => {
                    let tick_context = Arc::clone(&context);
                    if let Err(e) = tokio::task::spawn_blocking(move || tick_context.tick()).await {
                        warn!(session_id = %context.session_id, error = %e, "detection tick panicked");
                    }
                }
            }
        }
    }

    /// Capture the current full-resolution frame and turn it into a page.
    ///
    /// Returns `Ok(None)` if the session is not `Live` or another capture is
    /// already running. The last detected outline is used even if detection
    /// has since been lost; with no outline the pipeline tries one more
    /// detection on the full frame and otherwise keeps it whole.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn capture(&self) -> Result<Option<PageArtifact>> {
        if self
            .capture_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("capture already in flight");
            return Ok(None);
        }
        let _guard = CaptureGuard {
            in_flight: &self.capture_in_flight,
            state: &self.state,
        };

        let source = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match (&self.source, *state) {
                (Some(source), SessionState::Live) => {
                    *state = SessionState::Capturing;
                    Arc::clone(source)
                }
                (_, current) => {
                    debug!(state = ?current, "capture not possible");
                    return Ok(None);
                }
            }
        };

        let outcome: DetectionOutcome = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last_found
            .into();
        let pipeline = Arc::clone(&self.pipeline);

        let artifact = tokio::task::spawn_blocking(move || {
            let frame = source
                .grab()?
                .ok_or_else(|| ScanwerkError::Camera("no frame available at capture".into()))?;
            pipeline.process(frame, &outcome, Utc::now())
        })
        .await
        .map_err(|e| ScanwerkError::Session(format!("capture task: {e}")))??;

        info!(name = %artifact.name, found = outcome.is_found(), "capture complete");
        Ok(Some(artifact))
    }

    /// Halt detection and release the camera. Safe to call more than once.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn stop(&mut self) {
        if self.state() == SessionState::Stopped {
            return;
        }

        self.shutdown_signal.notify_one();
        if let Some(handle) = self.task_handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "detection loop ended abnormally");
            }
        }

        if let Some(source) = self.source.take() {
            source.release();
        }
        self.context = None;

        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.snapshots.send_replace(DetectionSnapshot::default());

        self.set_state(SessionState::Stopped);
        info!("capture session stopped");
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
        if let Some(source) = self.source.take() {
            source.release();
            debug!(session_id = %self.id, "video source released on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use scanwerk_bridge::{MemoryConsentStore, StillFrameSource, StillImageCamera};

    fn blank() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([128, 128, 128])))
    }

    fn quiet_config() -> ScannerConfig {
        let mut config = ScannerConfig::default();
        // Long enough that only the immediate first tick runs during a test.
        config.session.tick_interval_ms = 60_000;
        config
    }

    fn session(source: Arc<StillFrameSource>) -> CaptureSession {
        CaptureSession::new(
            quiet_config(),
            Arc::new(StillImageCamera::new(source)),
            Arc::new(MemoryConsentStore::new()),
        )
    }

    #[test]
    fn new_session_is_idle() {
        let session = session(Arc::new(StillFrameSource::new(blank())));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.camera_available());
        assert_eq!(session.poll_detection(), None);
        assert_eq!(session.last_outcome(), DetectionOutcome::NotFound);
    }

    #[tokio::test]
    async fn capture_before_start_is_not_possible() {
        let session = session(Arc::new(StillFrameSource::new(blank())));
        assert!(session.capture().await.unwrap().is_none());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn start_is_only_honoured_once() {
        let source = Arc::new(StillFrameSource::new(blank()));
        let mut session = session(source);
        assert_eq!(session.start().await, SessionState::Live);
        assert_eq!(session.start().await, SessionState::Live);
        session.stop().await;
        assert_eq!(session.start().await, SessionState::Stopped);
    }

    #[tokio::test]
    async fn missing_frame_at_capture_is_an_error_and_session_stays_live() {
        let source = Arc::new(StillFrameSource::empty());
        let mut session = session(Arc::clone(&source));
        session.start().await;

        let result = session.capture().await;
        assert!(matches!(result, Err(ScanwerkError::Camera(_))));
        assert_eq!(session.state(), SessionState::Live);

        source.set_frame(blank());
        assert!(session.capture().await.unwrap().is_some());
        session.stop().await;
    }
}
