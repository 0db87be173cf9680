//! Transform mode transitions
//!
//! Switching between volume and camera mode is the one state change that
//! outside observers care about: the geometry before the switch is handed to
//! a listener (for undo), then the new geometry is resolved and pushed on.

use crate::camera::properties::{HologramCameraProperties, TransformMode};
use crate::geometry::{FrustumResolver, ResolvedFrustum};
use crate::quilt::QuiltResolution;

/// Record of one mode switch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeTransition {
    pub from: TransformMode,
    pub to: TransformMode,
    /// Geometry right before the switch
    pub before: ResolvedFrustum,
    /// Geometry right after the switch
    pub after: ResolvedFrustum,
}

/// Receives camera output changes.
///
/// All methods default to doing nothing.
pub trait CameraListener {
    /// Geometry snapshot taken before a mode switch
    fn record_snapshot(&mut self, _transition: &ModeTransition) {}

    /// Frustum changed; the renderer should reset
    fn geometry_changed(&mut self, _frustum: &ResolvedFrustum) {}

    /// Render target changed
    fn quilt_changed(&mut self, _quilt: &QuiltResolution) {}
}

/// Listener that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl CameraListener for NoopListener {}

/// One observed change
#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    Snapshot(ModeTransition),
    Geometry(ResolvedFrustum),
    Quilt(QuiltResolution),
}

/// Listener that keeps every event, in order
#[derive(Debug, Default, Clone)]
pub struct RecordingListener {
    pub events: Vec<CameraEvent>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent geometry pushed
    pub fn last_geometry(&self) -> Option<&ResolvedFrustum> {
        self.events.iter().rev().find_map(|e| match e {
            CameraEvent::Geometry(f) => Some(f),
            _ => None,
        })
    }

    /// Most recent render target pushed
    pub fn last_quilt(&self) -> Option<&QuiltResolution> {
        self.events.iter().rev().find_map(|e| match e {
            CameraEvent::Quilt(q) => Some(q),
            _ => None,
        })
    }

    /// Snapshots taken so far
    pub fn snapshots(&self) -> impl Iterator<Item = &ModeTransition> {
        self.events.iter().filter_map(|e| match e {
            CameraEvent::Snapshot(t) => Some(t),
            _ => None,
        })
    }
}

impl CameraListener for RecordingListener {
    fn record_snapshot(&mut self, transition: &ModeTransition) {
        self.events.push(CameraEvent::Snapshot(*transition));
    }

    fn geometry_changed(&mut self, frustum: &ResolvedFrustum) {
        self.events.push(CameraEvent::Geometry(*frustum));
    }

    fn quilt_changed(&mut self, quilt: &QuiltResolution) {
        self.events.push(CameraEvent::Quilt(quilt.clone()));
    }
}

/// Drives transform mode switches for one camera
#[derive(Debug, Clone, Default)]
pub struct TransformModeController {
    resolver: FrustumResolver,
}

impl TransformModeController {
    pub fn new(resolver: FrustumResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &FrustumResolver {
        &self.resolver
    }

    /// Switch `props` to `to`.
    ///
    /// Does nothing and returns `None` when already in that mode. Otherwise
    /// the listener gets the pre-switch snapshot, then the re-resolved
    /// geometry. The inactive group keeps its values.
    pub fn transition(
        &self,
        props: &mut HologramCameraProperties,
        to: TransformMode,
        aspect: f32,
        listener: &mut dyn CameraListener,
    ) -> Option<ModeTransition> {
        let from = props.transform_mode();
        if from == to {
            return None;
        }

        let before = self.resolver.resolve(props, aspect);
        props.set_transform_mode(to);
        let after = self.resolver.resolve(props, aspect);

        let transition = ModeTransition {
            from,
            to,
            before,
            after,
        };
        tracing::info!(
            "Transform mode {} -> {}",
            from.display_name(),
            to.display_name()
        );
        listener.record_snapshot(&transition);
        listener.geometry_changed(&after);
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::properties::{CameraParams, SizeMode, VolumeParams};

    fn sample() -> HologramCameraProperties {
        HologramCameraProperties::from_parts(
            TransformMode::Volume,
            VolumeParams {
                size: 3.0,
                size_mode: SizeMode::ManualSize,
                near_clip_factor: 0.3,
                far_clip_factor: 0.6,
            },
            CameraParams {
                near_clip_plane: 2.0,
                far_clip_plane: 40.0,
                focal_plane: 12.0,
            },
        )
    }

    #[test]
    fn test_same_mode_is_noop() {
        let controller = TransformModeController::default();
        let mut props = sample();
        let mut listener = RecordingListener::new();
        assert!(controller
            .transition(&mut props, TransformMode::Volume, 1.0, &mut listener)
            .is_none());
        assert!(listener.events.is_empty());
    }

    #[test]
    fn test_round_trip_restores_values() {
        let controller = TransformModeController::default();
        let mut props = sample();
        let original = props.clone();
        let mut listener = RecordingListener::new();

        controller.transition(&mut props, TransformMode::Camera, 0.75, &mut listener);
        controller.transition(&mut props, TransformMode::Volume, 0.75, &mut listener);

        assert_eq!(props, original);
        assert_eq!(listener.snapshots().count(), 2);
    }

    #[test]
    fn test_snapshot_precedes_geometry() {
        let controller = TransformModeController::default();
        let mut props = sample();
        let expected_before = controller.resolver().resolve(&props, 1.0);
        let mut listener = RecordingListener::new();

        let transition = controller
            .transition(&mut props, TransformMode::Camera, 1.0, &mut listener)
            .unwrap();
        assert_eq!(transition.before, expected_before);
        assert_eq!(transition.after.near_clip_plane, 2.0);
        assert_eq!(transition.after.far_clip_plane, 40.0);

        assert!(matches!(listener.events[0], CameraEvent::Snapshot(_)));
        assert_eq!(listener.last_geometry(), Some(&transition.after));
    }
}
