// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tone enhancement for rectified pages — gamma lift followed by a
// contrast/brightness stretch, applied per channel.

use image::{DynamicImage, Rgba};
use scanwerk_core::config::EnhanceConfig;
use tracing::{debug, instrument};

/// Deterministic per-pixel tone curve.
///
/// The curve only depends on the input channel value, so it is evaluated once
/// into a 256-entry table and then applied to R, G and B. Alpha is copied
/// unchanged.
#[derive(Debug, Clone)]
pub struct ToneEnhancer {
    config: EnhanceConfig,
    table: [u8; 256],
}

impl Default for ToneEnhancer {
    fn default() -> Self {
        Self::new(EnhanceConfig::default())
    }
}

impl ToneEnhancer {
    pub fn new(config: EnhanceConfig) -> Self {
        let table = std::array::from_fn(|v| tone_curve(v as u8, &config));
        Self { config, table }
    }

    pub fn config(&self) -> &EnhanceConfig {
        &self.config
    }

    /// Map a single channel value through the curve.
    pub fn map_channel(&self, value: u8) -> u8 {
        self.table[usize::from(value)]
    }

    /// Enhance an image. The result is always RGBA8.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn enhance(&self, image: &DynamicImage) -> DynamicImage {
        let mut rgba = image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            let Rgba([r, g, b, a]) = *pixel;
            *pixel = Rgba([self.map_channel(r), self.map_channel(g), self.map_channel(b), a]);
        }
        debug!(
            gamma = self.config.gamma,
            contrast = self.config.contrast,
            brightness = self.config.brightness,
            "tone curve applied"
        );
        DynamicImage::ImageRgba8(rgba)
    }
}

/// `255 * (v / 255)^gamma`, then `(v' - 128) * contrast + 128 + brightness`,
/// clamped and rounded.
fn tone_curve(value: u8, config: &EnhanceConfig) -> u8 {
    let lifted = 255.0 * (f32::from(value) / 255.0).powf(config.gamma);
    let stretched = (lifted - 128.0) * config.contrast + 128.0 + config.brightness;
    stretched.clamp(0.0, 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, RgbaImage};

    #[test]
    fn mid_gray_is_brightened_deterministically() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([128, 128, 128])));
        let enhancer = ToneEnhancer::default();

        let first = enhancer.enhance(&img);
        let second = ToneEnhancer::default().enhance(&img);
        assert_eq!(first, second);

        // 255 * (128/255)^0.8 = 146.9; (146.9 - 128) * 1.3 + 143 = 167.6
        let out = first.to_rgba8();
        assert!(out.pixels().all(|p| p.0 == [168, 168, 168, 255]));
    }

    #[test]
    fn extremes_clamp() {
        let enhancer = ToneEnhancer::default();
        assert_eq!(enhancer.map_channel(0), 0);
        assert_eq!(enhancer.map_channel(255), 255);
    }

    #[test]
    fn curve_is_monotonic() {
        let enhancer = ToneEnhancer::default();
        for v in 1..=255u8 {
            assert!(enhancer.map_channel(v) >= enhancer.map_channel(v - 1));
        }
    }

    #[test]
    fn alpha_is_untouched_and_channels_independent() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 128, 240, 77])));
        let enhancer = ToneEnhancer::default();
        let out = enhancer.enhance(&img).to_rgba8();
        let expected = [
            enhancer.map_channel(10),
            enhancer.map_channel(128),
            enhancer.map_channel(240),
            77,
        ];
        assert!(out.pixels().all(|p| p.0 == expected));
    }

    #[test]
    fn identity_settings_leave_pixels_alone() {
        let enhancer = ToneEnhancer::new(EnhanceConfig {
            gamma: 1.0,
            contrast: 1.0,
            brightness: 0.0,
        });
        assert!((0..=255u8).all(|v| enhancer.map_channel(v) == v));
    }
}
