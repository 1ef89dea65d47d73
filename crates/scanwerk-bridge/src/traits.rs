// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the capabilities the capture
// session needs from its host.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use scanwerk_core::error::Result;

/// A live camera stream.
///
/// Frames are pulled, never pushed: each call to [`grab`](Self::grab) returns
/// whatever the camera is showing right now, so a slow consumer simply sees
/// fewer frames.
pub trait VideoSource: Send + Sync {
    /// The current frame at full sensor resolution.
    /// Returns Ok(None) if the stream has not produced a frame yet.
    fn grab(&self) -> Result<Option<DynamicImage>>;

    /// Stop the stream and free the device. Must be idempotent.
    fn release(&self);

    /// Whether [`release`](Self::release) has been called.
    fn is_released(&self) -> bool;
}

/// Opens the device camera.
pub trait CameraAccess: Send + Sync {
    /// Open a live stream. `consent_on_record` tells the platform that the
    /// user already agreed recently and no prompt should be shown.
    ///
    /// Returns `PermissionDenied` if the user refuses and
    /// `PlatformUnavailable` if there is no usable camera.
    fn open(&self, consent_on_record: bool) -> Result<Arc<dyn VideoSource>>;
}

/// Remembers consent decisions with an expiry.
pub trait ConsentStore: Send + Sync {
    /// Whether `key` was granted and the grant has not expired.
    fn is_granted(&self, key: &str) -> Result<bool>;

    /// Record a grant for `key` valid for `ttl` from now.
    fn grant(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Forget any grant for `key`.
    fn revoke(&self, key: &str) -> Result<()>;
}
