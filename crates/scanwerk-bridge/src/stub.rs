// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub camera for desktop/CI builds where no live camera integration exists.

use std::sync::Arc;

use scanwerk_core::error::{Result, ScanwerkError};

use crate::traits::{CameraAccess, VideoSource};

/// Camera access that never succeeds.
pub struct StubCamera;

impl CameraAccess for StubCamera {
    fn open(&self, _consent_on_record: bool) -> Result<Arc<dyn VideoSource>> {
        tracing::warn!("CameraAccess::open called on stub camera");
        Err(ScanwerkError::PlatformUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_reports_platform_unavailable() {
        assert!(matches!(
            StubCamera.open(true),
            Err(ScanwerkError::PlatformUnavailable)
        ));
    }
}
