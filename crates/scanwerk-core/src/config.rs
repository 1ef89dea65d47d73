// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};

/// Complete scanner settings. Every section falls back to its defaults when
/// missing from a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub detection: DetectionConfig,
    pub enhance: EnhanceConfig,
    pub page: PageConfig,
    pub session: SessionConfig,
}

impl ScannerConfig {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;
        if d.edge_passes.is_empty() {
            return Err(ScanwerkError::Config("at least one edge pass is required".into()));
        }
        if d.edge_passes.iter().any(|p| p.low <= 0.0 || p.high < p.low) {
            return Err(ScanwerkError::Config(
                "edge pass thresholds must satisfy 0 < low <= high".into(),
            ));
        }
        if d.blur_sigma <= 0.0 {
            return Err(ScanwerkError::Config("blur sigma must be positive".into()));
        }
        if !(0.0..1.0).contains(&d.min_area_ratio) {
            return Err(ScanwerkError::Config("min area ratio must be in [0, 1)".into()));
        }
        if d.approx_epsilon_ratio <= 0.0 {
            return Err(ScanwerkError::Config(
                "approximation epsilon ratio must be positive".into(),
            ));
        }
        if self.enhance.gamma <= 0.0 || self.enhance.contrast <= 0.0 {
            return Err(ScanwerkError::Config("gamma and contrast must be positive".into()));
        }
        let (w_mm, h_mm) = self.page.paper_size.dimensions_mm();
        if self.page.margin_mm < 0.0 || 2.0 * self.page.margin_mm >= w_mm.min(h_mm) as f32 {
            return Err(ScanwerkError::Config("page margin leaves no printable area".into()));
        }
        if self.page.image_dpi <= 0.0 {
            return Err(ScanwerkError::Config("image DPI must be positive".into()));
        }
        if self.session.tick_interval_ms == 0 || self.session.analysis_max_width == 0 {
            return Err(ScanwerkError::Config(
                "tick interval and analysis width must be non-zero".into(),
            ));
        }
        if self.session.stability_threshold == 0 {
            return Err(ScanwerkError::Config("stability threshold must be at least 1".into()));
        }
        Ok(())
    }
}

/// One Canny pass: hysteresis thresholds on gradient magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgePass {
    pub low: f32,
    pub high: f32,
}

/// Frame analyzer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Gaussian sigma; 1.7 matches a 9x9 kernel.
    pub blur_sigma: f32,
    /// Edge passes from conservative to aggressive, OR-combined.
    pub edge_passes: Vec<EdgePass>,
    /// L-infinity radius of the closing structuring element (1 = 3x3).
    pub close_radius: u8,
    /// Minimum candidate area as a fraction of the analyzed frame area.
    pub min_area_ratio: f64,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub approx_epsilon_ratio: f64,
    /// A primary candidate smaller than `min_area * fallback_factor` triggers
    /// the minimum-area-rectangle pass.
    pub fallback_factor: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.7,
            edge_passes: vec![
                EdgePass { low: 50.0, high: 150.0 },
                EdgePass { low: 75.0, high: 200.0 },
                EdgePass { low: 100.0, high: 250.0 },
            ],
            close_radius: 1,
            min_area_ratio: 0.10,
            approx_epsilon_ratio: 0.02,
            fallback_factor: 2.0,
        }
    }
}

/// Tone curve applied to the rectified page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub gamma: f32,
    pub contrast: f32,
    pub brightness: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            gamma: 0.8,
            contrast: 1.3,
            brightness: 15.0,
        }
    }
}

/// Output page layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub paper_size: crate::PaperSize,
    /// Margin on every side, in millimetres.
    pub margin_mm: f32,
    /// Nominal resolution used to express the image in PDF units.
    pub image_dpi: f32,
    /// Title written to the PDF metadata.
    pub title: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            paper_size: crate::PaperSize::A4,
            margin_mm: 10.0,
            image_dpi: 150.0,
            title: "Scanned Document".into(),
        }
    }
}

/// Capture session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Detection loop period (best effort).
    pub tick_interval_ms: u64,
    /// Live frames wider than this are downscaled before analysis.
    pub analysis_max_width: u32,
    /// Consecutive detections needed before the UI shows "confident".
    pub stability_threshold: u32,
    /// How long a granted camera consent is remembered.
    pub consent_ttl_days: u32,
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn consent_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.consent_ttl_days) * 24 * 60 * 60)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            analysis_max_width: 640,
            stability_threshold: 3,
            consent_ttl_days: 365,
        }
    }
}
