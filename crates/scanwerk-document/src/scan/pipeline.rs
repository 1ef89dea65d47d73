// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture pipeline — rectify, enhance, and package one captured frame.

use chrono::{DateTime, Utc};
use image::DynamicImage;
use scanwerk_core::ScannerConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{info, instrument};

use crate::pdf::writer::{DocumentPackager, PageArtifact};
use crate::scan::detect::{DetectionOutcome, DocumentDetector};
use crate::scan::enhance::ToneEnhancer;
use crate::scan::rectify::Rectifier;

/// Everything that happens to a frame after the user presses capture.
#[derive(Debug, Clone, Default)]
pub struct CapturePipeline {
    rectifier: Rectifier,
    enhancer: ToneEnhancer,
    packager: DocumentPackager,
}

impl CapturePipeline {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            rectifier: Rectifier::new(DocumentDetector::new(config.detection.clone())),
            enhancer: ToneEnhancer::new(config.enhance),
            packager: DocumentPackager::new(config.page.clone()),
        }
    }

    /// Rectified and enhanced page image, before packaging.
    pub fn prepare(&self, frame: DynamicImage, outcome: &DetectionOutcome) -> DynamicImage {
        let flat = self.rectifier.rectify(frame, outcome);
        self.enhancer.enhance(&flat)
    }

    /// Run the full capture path and return the finished page.
    ///
    /// An empty frame is rejected here rather than reaching the packager.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height(), found = outcome.is_found()))]
    pub fn process(
        &self,
        frame: DynamicImage,
        outcome: &DetectionOutcome,
        captured_at: DateTime<Utc>,
    ) -> Result<PageArtifact> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(ScanwerkError::ImageError("captured frame is empty".into()));
        }

        let page = self.prepare(frame, outcome);
        let artifact = self.packager.pack(&page, captured_at)?;
        info!(
            name = %artifact.name,
            width = page.width(),
            height = page.height(),
            bytes = artifact.bytes.len(),
            "capture packaged"
        );
        Ok(artifact)
    }
}
