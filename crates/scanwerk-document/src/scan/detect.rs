// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary detection on a single frame — multi-threshold Canny,
// morphological closing, contour tracing, and a two-tier quadrilateral search.

use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::min_area_rect;
use imageproc::morphology::close;
use scanwerk_core::config::DetectionConfig;
use scanwerk_core::error::{Result, ScanwerkError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::geometry::{Point, Quadrilateral, order_points};
use crate::scan::contour::{approximate_closed, closed_perimeter, contour_area};

/// Frames smaller than this on either side are rejected.
const MIN_FRAME_SIDE: u32 = 3;

/// Result of analysing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DetectionOutcome {
    /// A document boundary in canonical corner order.
    Found(Quadrilateral),
    NotFound,
}

impl DetectionOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn quad(&self) -> Option<&Quadrilateral> {
        match self {
            Self::Found(q) => Some(q),
            Self::NotFound => None,
        }
    }

    /// Apply `f` to the quadrilateral, if any.
    pub fn map(self, f: impl FnOnce(Quadrilateral) -> Quadrilateral) -> Self {
        match self {
            Self::Found(q) => Self::Found(f(q)),
            Self::NotFound => Self::NotFound,
        }
    }
}

impl From<Option<Quadrilateral>> for DetectionOutcome {
    fn from(quad: Option<Quadrilateral>) -> Self {
        quad.map_or(Self::NotFound, Self::Found)
    }
}

/// Which search tier produced a candidate (for logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Polygon,
    MinAreaRect,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    quad: Quadrilateral,
    area: f64,
    tier: Tier,
}

/// Finds the most plausible document quadrilateral in a frame.
///
/// Stateless apart from its parameters; cheap to clone and safe to share
/// between the live loop and the capture path.
#[derive(Debug, Clone, Default)]
pub struct DocumentDetector {
    config: DetectionConfig,
}

impl DocumentDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Analyse one frame. Never fails: any internal fault is logged and
    /// reported as `NotFound`.
    #[instrument(level = "debug", skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn analyze(&self, frame: &DynamicImage) -> DetectionOutcome {
        match self.locate(frame) {
            Ok(candidate) => candidate.into(),
            Err(err) => {
                warn!(error = %err, "frame analysis failed; treating as not found");
                DetectionOutcome::NotFound
            }
        }
    }

    fn locate(&self, frame: &DynamicImage) -> Result<Option<Quadrilateral>> {
        let (width, height) = (frame.width(), frame.height());
        if width < MIN_FRAME_SIDE || height < MIN_FRAME_SIDE {
            return Err(ScanwerkError::Analysis(format!(
                "frame {width}x{height} is too small to analyse"
            )));
        }

        let edges = self.edge_map(frame);
        let contours: Vec<Contour<i32>> = find_contours::<i32>(&edges)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .collect();
        debug!(contours = contours.len(), "outer contours traced");

        let min_area = f64::from(width) * f64::from(height) * self.config.min_area_ratio;
        let primary = self.best_polygon(&contours, min_area);

        let needs_fallback =
            primary.is_none_or(|c| c.area < min_area * self.config.fallback_factor);
        let chosen = if needs_fallback {
            largest_contour_rect(&contours, min_area).or(primary)
        } else {
            primary
        };

        Ok(chosen.map(|c| {
            debug!(tier = ?c.tier, area = c.area, min_area, "document candidate selected");
            order_points(c.quad.corners())
        }))
    }

    /// Blurred grayscale → OR of every Canny pass → closing.
    fn edge_map(&self, frame: &DynamicImage) -> GrayImage {
        let gray = frame.to_luma8();
        let blurred = gaussian_blur_f32(&gray, self.config.blur_sigma);

        let mut combined = GrayImage::new(gray.width(), gray.height());
        for pass in &self.config.edge_passes {
            let edges = canny(&blurred, pass.low, pass.high);
            for (dst, src) in combined.pixels_mut().zip(edges.pixels()) {
                dst.0[0] |= src.0[0];
            }
        }

        if self.config.close_radius == 0 {
            return combined;
        }
        close(&combined, Norm::LInf, self.config.close_radius)
    }

    /// Largest 4-vertex approximation enclosing more than `min_area`.
    fn best_polygon(&self, contours: &[Contour<i32>], min_area: f64) -> Option<Candidate> {
        contours
            .iter()
            .filter_map(|contour| {
                let epsilon = self.config.approx_epsilon_ratio * closed_perimeter(&contour.points);
                if epsilon <= 0.0 {
                    return None;
                }
                let polygon = approximate_closed(&contour.points, epsilon);
                if polygon.len() != 4 {
                    return None;
                }
                let area = contour_area(&polygon);
                (area > min_area).then(|| Candidate {
                    quad: Quadrilateral::from_corners(to_corners(&polygon)),
                    area,
                    tier: Tier::Polygon,
                })
            })
            .max_by(|a, b| a.area.total_cmp(&b.area))
    }
}

/// Minimum-area bounding rectangle of the largest contour above `min_area`.
fn largest_contour_rect(contours: &[Contour<i32>], min_area: f64) -> Option<Candidate> {
    let (contour, area) = contours
        .iter()
        .map(|c| (c, contour_area(&c.points)))
        .filter(|&(_, area)| area > min_area)
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    let rect = min_area_rect(&contour.points);
    Some(Candidate {
        quad: Quadrilateral::from_corners(to_corners(&rect)),
        area,
        tier: Tier::MinAreaRect,
    })
}

fn to_corners(points: &[imageproc::point::Point<i32>]) -> [Point; 4] {
    std::array::from_fn(|i| Point::new(f64::from(points[i].x), f64::from(points[i].y)))
}
