// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stability gate — turns the per-frame detection stream into a "document is
// steadily in view" signal for the UI.
//
// The signal is feedback only. It never gates capture: the user may capture
// at any time and the last detected outline is used regardless.

use scanwerk_document::{DetectionOutcome, Quadrilateral};

/// Consecutive-detection counter and the derived confidence flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StabilityState {
    pub counter: u32,
    pub confident: bool,
}

/// What the UI draws: stability plus the outline to overlay, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectionSnapshot {
    pub state: StabilityState,
    pub overlay: Option<Quadrilateral>,
}

#[derive(Debug, Clone)]
pub struct StabilityGate {
    state: StabilityState,
    threshold: u32,
    overlay: Option<Quadrilateral>,
}

impl Default for StabilityGate {
    fn default() -> Self {
        Self::new(3)
    }
}

impl StabilityGate {
    pub fn new(threshold: u32) -> Self {
        Self {
            state: StabilityState::default(),
            threshold,
            overlay: None,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Feed one frame's outcome.
    ///
    /// Any miss resets the run. The outline position is not compared between
    /// frames, so a document that moves but stays detected keeps counting.
    pub fn update(&mut self, outcome: &DetectionOutcome) -> StabilityState {
        match outcome {
            DetectionOutcome::Found(quad) => {
                self.state.counter = self.state.counter.saturating_add(1);
                self.state.confident = self.state.counter >= self.threshold;
                self.overlay = Some(*quad);
            }
            DetectionOutcome::NotFound => {
                self.state = StabilityState::default();
                self.overlay = None;
            }
        }
        self.state
    }

    pub fn reset(&mut self) {
        self.state = StabilityState::default();
        self.overlay = None;
    }

    pub fn state(&self) -> StabilityState {
        self.state
    }

    pub fn overlay(&self) -> Option<&Quadrilateral> {
        self.overlay.as_ref()
    }

    pub fn snapshot(&self) -> DetectionSnapshot {
        DetectionSnapshot {
            state: self.state,
            overlay: self.overlay,
        }
    }
}
