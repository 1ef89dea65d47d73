// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document — Document processing for the Scanwerk capture pipeline.
//
// Provides quadrilateral geometry, live-frame document detection, perspective
// rectification, tone enhancement, and single-page PDF packaging.

pub mod geometry;
pub mod image;
pub mod pdf;
pub mod scan;

// Re-export the primary structs so callers can use `scanwerk_document::DocumentDetector` etc.
pub use geometry::{Point, Quadrilateral, edge_length, order_points};
pub use crate::image::frame::WorkingFrame;
pub use pdf::writer::{DocumentPackager, ImagePlacement, PageArtifact};
pub use scan::detect::{DetectionOutcome, DocumentDetector};
pub use scan::enhance::ToneEnhancer;
pub use scan::pipeline::CapturePipeline;
pub use scan::rectify::Rectifier;
