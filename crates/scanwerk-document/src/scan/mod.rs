// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — document detection, perspective rectification, tone
// enhancement, and the capture-to-PDF composition of the three.

mod contour;
pub mod detect;
pub mod enhance;
pub mod pipeline;
pub mod rectify;

pub use detect::{DetectionOutcome, DocumentDetector};
pub use enhance::ToneEnhancer;
pub use pipeline::CapturePipeline;
pub use rectify::Rectifier;
