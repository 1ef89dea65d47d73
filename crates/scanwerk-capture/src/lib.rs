// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-capture — the live side of the scanner: a capture session that
// owns the camera stream, runs the detection loop, and turns a user capture
// into a page.

pub mod session;
pub mod stability;

pub use session::CaptureSession;
pub use stability::{DetectionSnapshot, StabilityGate, StabilityState};
