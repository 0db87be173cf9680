//! Display target sync
//!
//! Pushes the output resolution of the chosen display to every viewport
//! bound to it. Failures are logged and never propagated.

use serde::Serialize;

use super::viewport::{ViewportError, ViewportId, ViewportRegistry};
use crate::calibration::CalibrationRecord;
use crate::quilt::DeviceProfile;

/// Resolution a display target renders at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTarget {
    pub width: u32,
    pub height: u32,
    pub device_type_name: String,
    /// Resolution comes from an attached display rather than an emulated one
    pub attached: bool,
}

impl DisplayTarget {
    /// Target for the attached display, or the emulated device without one
    pub fn resolve(calibration: Option<&CalibrationRecord>, emulated: &DeviceProfile) -> Self {
        match calibration {
            Some(record) => Self {
                width: record.screen_width,
                height: record.screen_height,
                device_type_name: record.device_type_name.clone(),
                attached: true,
            },
            None => Self {
                width: emulated.screen_width,
                height: emulated.screen_height,
                device_type_name: emulated.type_name.to_string(),
                attached: false,
            },
        }
    }
}

/// What a sync did, for logs and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Viewports that accepted the new resolution
    pub updated: usize,
    /// Viewports bound to other displays
    pub skipped: usize,
    /// Viewports that rejected the new resolution
    pub failed: usize,
    /// Viewports found closed and removed
    pub pruned: usize,
}

/// Push the target resolution to every viewport bound to `target_display`.
///
/// Closed viewports are removed from `viewports`.
pub fn sync_display_target(
    viewports: &mut ViewportRegistry,
    target_display: u32,
    calibration: Option<&CalibrationRecord>,
    emulated: &DeviceProfile,
) -> SyncReport {
    let target = DisplayTarget::resolve(calibration, emulated);
    let mut report = SyncReport::default();
    let mut closed: Vec<ViewportId> = Vec::new();

    for (id, viewport) in viewports.iter_mut() {
        if viewport.target_display() != target_display {
            report.skipped += 1;
            continue;
        }
        match viewport.set_resolution(target.width, target.height, &target.device_type_name) {
            Ok(()) => report.updated += 1,
            Err(ViewportError::Closed) => {
                tracing::debug!("Viewport {} closed, removing", viewport.label());
                closed.push(id);
            }
            Err(e) => {
                tracing::warn!("Viewport {} not resized: {}", viewport.label(), e);
                report.failed += 1;
            }
        }
    }

    report.pruned = closed.len();
    viewports.remove_all(&closed);

    tracing::debug!(
        display = target_display,
        width = target.width,
        height = target.height,
        updated = report.updated,
        failed = report.failed,
        "Synced display target"
    );
    report
}
