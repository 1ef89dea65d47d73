// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Working frames — the live loop analyses a downscaled copy of each camera
// frame and maps detections back to full-resolution coordinates.

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::{debug, instrument};

use crate::scan::detect::DetectionOutcome;

/// A frame prepared for analysis, remembering how it relates to the source.
pub struct WorkingFrame {
    /// The (possibly downscaled) image to analyse.
    image: DynamicImage,
    /// Source width / working width.
    scale_x: f64,
    /// Source height / working height.
    scale_y: f64,
}

impl WorkingFrame {
    /// Downscale `source` so that it is at most `max_width` wide, preserving
    /// aspect ratio. Frames already narrow enough are used as-is.
    ///
    /// Triangle filtering keeps edges crisp enough for Canny while staying
    /// cheap enough for a per-tick call.
    #[instrument(level = "debug", skip(source), fields(width = source.width(), height = source.height()))]
    pub fn prepare(source: &DynamicImage, max_width: u32) -> Self {
        let (src_w, src_h) = (source.width(), source.height());
        if src_w <= max_width || src_w == 0 || src_h == 0 {
            return Self {
                image: source.clone(),
                scale_x: 1.0,
                scale_y: 1.0,
            };
        }

        let work_w = max_width.max(1);
        let work_h = ((f64::from(src_h) * f64::from(work_w) / f64::from(src_w)).round() as u32).max(1);
        let image = source.resize_exact(work_w, work_h, FilterType::Triangle);
        debug!(work_w, work_h, "frame downscaled for analysis");

        Self {
            image,
            scale_x: f64::from(src_w) / f64::from(work_w),
            scale_y: f64::from(src_h) / f64::from(work_h),
        }
    }

    /// The image to analyse.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// (source / working) scale factors on each axis.
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    /// Map a detection on the working image into source coordinates.
    pub fn to_source(&self, outcome: DetectionOutcome) -> DetectionOutcome {
        outcome.map(|q| q.scaled(self.scale_x, self.scale_y))
    }
}
