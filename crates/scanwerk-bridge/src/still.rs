// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A "camera" that shows a fixed picture. Used to drive the capture session
// from a photo on disk and in tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, info, instrument};

use crate::traits::{CameraAccess, VideoSource};

/// A video source whose current frame can be swapped at any time.
#[derive(Debug, Default)]
pub struct StillFrameSource {
    frame: Mutex<Option<DynamicImage>>,
    released: AtomicBool,
    grabs: AtomicUsize,
}

impl StillFrameSource {
    pub fn new(frame: DynamicImage) -> Self {
        Self {
            frame: Mutex::new(Some(frame)),
            ..Self::default()
        }
    }

    /// A source that has not produced any frame yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode the image file at `path` and show it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let frame = image::open(path.as_ref())
            .map_err(|e| ScanwerkError::ImageError(format!("decode: {e}")))?;
        info!(width = frame.width(), height = frame.height(), "still frame loaded");
        Ok(Self::new(frame))
    }

    /// Replace what the "camera" is looking at.
    pub fn set_frame(&self, frame: DynamicImage) {
        *self.frame.lock().unwrap_or_else(|e| e.into_inner()) = Some(frame);
    }

    /// How many times a frame has been handed out.
    pub fn grab_count(&self) -> usize {
        self.grabs.load(Ordering::Relaxed)
    }
}

impl VideoSource for StillFrameSource {
    fn grab(&self) -> Result<Option<DynamicImage>> {
        if self.is_released() {
            return Err(ScanwerkError::Camera("video source released".into()));
        }
        let frame = self.frame.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if frame.is_some() {
            self.grabs.fetch_add(1, Ordering::Relaxed);
        }
        Ok(frame)
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            debug!("still frame source released");
        }
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

/// How a [`StillImageCamera`] answers the permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAnswer {
    Allow,
    Deny,
}

/// Camera access that hands out one shared [`StillFrameSource`].
#[derive(Debug)]
pub struct StillImageCamera {
    source: Arc<StillFrameSource>,
    answer: PermissionAnswer,
    opens: AtomicUsize,
    consent_seen: Mutex<Vec<bool>>,
}

impl StillImageCamera {
    pub fn new(source: Arc<StillFrameSource>) -> Self {
        Self::with_answer(source, PermissionAnswer::Allow)
    }

    pub fn with_answer(source: Arc<StillFrameSource>, answer: PermissionAnswer) -> Self {
        Self {
            source,
            answer,
            opens: AtomicUsize::new(0),
            consent_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn source(&self) -> &Arc<StillFrameSource> {
        &self.source
    }

    /// Successful opens so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }

    /// The `consent_on_record` flag passed to each `open` call, in order.
    pub fn consent_flags(&self) -> Vec<bool> {
        self.consent_seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl CameraAccess for StillImageCamera {
    fn open(&self, consent_on_record: bool) -> Result<Arc<dyn VideoSource>> {
        self.consent_seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(consent_on_record);

        match self.answer {
            PermissionAnswer::Deny if !consent_on_record => Err(ScanwerkError::PermissionDenied),
            _ => {
                self.opens.fetch_add(1, Ordering::Relaxed);
                Ok(self.source.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frame(shade: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([shade; 3])))
    }

    #[test]
    fn grab_returns_the_current_frame() {
        let source = StillFrameSource::new(frame(10));
        assert_eq!(source.grab().unwrap(), Some(frame(10)));

        source.set_frame(frame(200));
        assert_eq!(source.grab().unwrap(), Some(frame(200)));
        assert_eq!(source.grab_count(), 2);
    }

    #[test]
    fn empty_source_has_no_frame_yet() {
        let source = StillFrameSource::empty();
        assert_eq!(source.grab().unwrap(), None);
        assert_eq!(source.grab_count(), 0);
    }

    #[test]
    fn release_is_idempotent_and_stops_grabs() {
        let source = StillFrameSource::new(frame(10));
        source.release();
        source.release();
        assert!(source.is_released());
        assert!(matches!(source.grab(), Err(ScanwerkError::Camera(_))));
    }

    #[test]
    fn denied_camera_opens_only_with_consent_on_record() {
        let source = Arc::new(StillFrameSource::new(frame(10)));
        let camera = StillImageCamera::with_answer(source, PermissionAnswer::Deny);

        assert!(matches!(camera.open(false), Err(ScanwerkError::PermissionDenied)));
        assert!(camera.open(true).is_ok());
        assert_eq!(camera.open_count(), 1);
        assert_eq!(camera.consent_flags(), vec![false, true]);
    }

    #[test]
    fn open_decodes_an_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        frame(77).save(&path).unwrap();

        let source = StillFrameSource::open(&path).unwrap();
        let grabbed = source.grab().unwrap().unwrap();
        assert_eq!((grabbed.width(), grabbed.height()), (8, 6));
    }

    #[test]
    fn missing_file_is_an_image_error() {
        let result = StillFrameSource::open("/definitely/not/here.png");
        assert!(matches!(result, Err(ScanwerkError::ImageError(_))));
    }
}
