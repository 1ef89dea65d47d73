// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-bridge — platform capabilities consumed by the capture session:
// camera access, live video sources, and remembered camera consent.

pub mod consent;
pub mod still;
pub mod stub;
pub mod traits;

use std::sync::Arc;

pub use consent::{MemoryConsentStore, SqliteConsentStore};
pub use still::{PermissionAnswer, StillFrameSource, StillImageCamera};
pub use traits::{CameraAccess, ConsentStore, VideoSource};

/// Key under which camera consent is remembered.
pub const CAMERA_CONSENT_KEY: &str = "camera";

/// The camera access implementation for the target platform.
///
/// Desktop and CI builds have no live camera integration and get the stub,
/// which always reports the camera as unavailable.
pub fn platform_camera() -> Arc<dyn CameraAccess> {
    Arc::new(stub::StubCamera)
}
