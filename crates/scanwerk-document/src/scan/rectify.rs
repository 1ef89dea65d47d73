// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — warp the document quadrilateral of a captured
// frame onto a flat rectangle.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, info, instrument, warn};

use crate::geometry::{Quadrilateral, order_points};
use crate::scan::detect::{DetectionOutcome, DocumentDetector};

/// Output sides longer than this multiple of the frame's larger side are
/// treated as a degenerate homography.
const MAX_UPSCALE: f64 = 4.0;

/// Flattens captured frames.
///
/// When the live loop never produced a quadrilateral, the rectifier gives
/// detection one more try on the full-resolution frame before falling back
/// to passing the frame through untouched.
#[derive(Debug, Clone, Default)]
pub struct Rectifier {
    detector: DocumentDetector,
}

impl Rectifier {
    pub fn new(detector: DocumentDetector) -> Self {
        Self { detector }
    }

    /// Rectify `frame` using `outcome`. Never fails: when no usable
    /// quadrilateral exists, or warping faults, the input is returned as-is.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height(), found = outcome.is_found()))]
    pub fn rectify(&self, frame: DynamicImage, outcome: &DetectionOutcome) -> DynamicImage {
        let quad = match outcome {
            DetectionOutcome::Found(quad) => *quad,
            DetectionOutcome::NotFound => match self.detector.analyze(&frame) {
                DetectionOutcome::Found(quad) => {
                    info!("last-chance detection on full-resolution frame succeeded");
                    quad
                }
                DetectionOutcome::NotFound => {
                    info!("no document boundary found; passing frame through");
                    return frame;
                }
            },
        };

        match warp_document(&frame, &quad) {
            Ok(flat) => flat,
            Err(err) => {
                warn!(error = %err, "rectification failed; passing frame through");
                frame
            }
        }
    }
}

/// Warp the region bounded by `quad` into a `W`x`H` image, where `W` and `H`
/// are the longer of each pair of opposite edges.
pub fn warp_document(frame: &DynamicImage, quad: &Quadrilateral) -> Result<DynamicImage> {
    let quad = order_points(quad.corners());
    let (width, height) = quad.target_size();
    let (out_w, out_h) = (width.round(), height.round());

    let limit = MAX_UPSCALE * f64::from(frame.width().max(frame.height()));
    if !(out_w >= 1.0 && out_h >= 1.0) || out_w > limit || out_h > limit {
        return Err(ScanwerkError::Rectification(format!(
            "degenerate target size {width:.1}x{height:.1}"
        )));
    }

    let dest: [(f32, f32); 4] = [
        (0.0, 0.0),                      // top-left
        (out_w as f32, 0.0),             // top-right
        (out_w as f32, out_h as f32),    // bottom-right
        (0.0, out_h as f32),             // bottom-left
    ];

    let projection = Projection::from_control_points(quad.control_points(), dest)
        .ok_or_else(|| ScanwerkError::Rectification("singular perspective transform".into()))?;

    let source = frame.to_rgba8();
    let mut output = RgbaImage::new(out_w as u32, out_h as u32);
    warp_into(
        &source,
        &projection,
        Interpolation::Bilinear,
        Rgba([255u8, 255, 255, 255]),
        &mut output,
    );

    debug!(out_w, out_h, "perspective warp applied");
    Ok(DynamicImage::ImageRgba8(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    /// Smoothly varying frame so that pass-through and warps are checkable.
    fn gradient_frame(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn quad(points: [(f64, f64); 4]) -> Quadrilateral {
        order_points(points.map(|(x, y)| Point::new(x, y)))
    }

    #[test]
    fn not_found_on_featureless_frame_passes_through_unchanged() {
        let frame = DynamicImage::ImageLuma8(GrayImage::from_pixel(240, 180, Luma([190u8])));
        let out = Rectifier::default().rectify(frame.clone(), &DetectionOutcome::NotFound);
        assert_eq!(out, frame);
    }

    #[test]
    fn axis_aligned_quad_crops_the_region() {
        let frame = gradient_frame(200, 150);
        let region = quad([(20.0, 10.0), (120.0, 10.0), (120.0, 90.0), (20.0, 90.0)]);
        let out = Rectifier::default()
            .rectify(frame.clone(), &DetectionOutcome::Found(region))
            .to_rgba8();

        assert_eq!(out.dimensions(), (100, 80));
        let expected = frame.to_rgba8().get_pixel(70, 50).0;
        let actual = out.get_pixel(50, 40).0;
        for c in 0..3 {
            assert!(
                (i16::from(expected[c]) - i16::from(actual[c])).abs() <= 1,
                "channel {c}: expected {expected:?}, got {actual:?}"
            );
        }
    }

    #[test]
    fn unequal_edges_use_the_longer_one() {
        // Top edge 400 px, bottom edge 440 px.
        let frame = gradient_frame(600, 500);
        let region = quad([(40.0, 50.0), (440.0, 50.0), (480.0, 350.0), (40.0, 350.0)]);
        let out = Rectifier::default().rectify(frame, &DetectionOutcome::Found(region));
        assert_eq!(out.width(), 440);
        assert_eq!(out.height(), 303); // hypot(40, 300) rounded
    }

    #[test]
    fn corner_order_does_not_matter() {
        let frame = gradient_frame(300, 300);
        let shuffled = Quadrilateral::from_corners([
            Point::new(250.0, 260.0),
            Point::new(30.0, 20.0),
            Point::new(40.0, 250.0),
            Point::new(260.0, 30.0),
        ]);
        let canonical = order_points(shuffled.corners());
        let a = warp_document(&frame, &shuffled).expect("warp");
        let b = warp_document(&frame, &canonical).expect("warp");
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_quad_passes_through() {
        let frame = gradient_frame(120, 90);
        let collapsed = Quadrilateral::from_corners([Point::new(10.0, 10.0); 4]);
        let out = Rectifier::default().rectify(frame.clone(), &DetectionOutcome::Found(collapsed));
        assert_eq!(out, frame);
        assert!(matches!(
            warp_document(&frame, &collapsed),
            Err(ScanwerkError::Rectification(_))
        ));
    }

    #[test]
    fn last_chance_detection_rectifies_full_frame() {
        let mut img = RgbImage::from_pixel(400, 300, Rgb([30, 30, 35]));
        for y in 60..240 {
            for x in 80..320 {
                img.put_pixel(x, y, Rgb([235, 235, 230]));
            }
        }
        let frame = DynamicImage::ImageRgb8(img);
        let out = Rectifier::default().rectify(frame, &DetectionOutcome::NotFound);

        assert!((i64::from(out.width()) - 240).abs() <= 12, "width {}", out.width());
        assert!((i64::from(out.height()) - 180).abs() <= 12, "height {}", out.height());
    }
}
