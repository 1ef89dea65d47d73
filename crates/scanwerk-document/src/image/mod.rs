// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — reduced-resolution working copies of live frames.

pub mod frame;

pub use frame::WorkingFrame;
