//! Hologram camera
//!
//! Owns the geometry properties and the render-target choices of one camera
//! and keeps them in step with the attached display.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::controller::{CameraListener, ModeTransition, TransformModeController};
use super::properties::{
    CameraParams, HologramCameraProperties, ModeFieldsMut, SizeMode, TransformMode, VolumeParams,
};
use crate::calibration::{CalibrationLoadError, CalibrationRecord, CalibrationRegistry};
use crate::geometry::{
    dragged_size, DepthScaling, FrustumResolver, HandleFrame, ProportionalDepth, ResolvedFrustum,
    SizeHandle,
};
use crate::quilt::{
    DeviceType, QuiltPreset, QuiltPresetResolver, QuiltRequest, QuiltResolution, QuiltSettings,
};

/// Default vertical field of view in degrees
pub const DEFAULT_FIELD_OF_VIEW: f32 = 14.0;

/// Where a camera takes its calibration from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ManualCalibrationMode {
    /// The discovered display the camera targets
    #[default]
    Disabled,
    /// A calibration JSON file
    UseCalibrationFile,
    /// A calibration entered by hand
    UseManualSettings,
}

/// Clip planes and field of view of an ordinary perspective camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConventionalCamera {
    pub near_clip_plane: f32,
    pub far_clip_plane: f32,
    /// Vertical field of view in degrees
    pub field_of_view: f32,
}

/// Outcome of matching the camera's target serial against the registry
#[derive(Debug, Clone, PartialEq)]
pub enum TargetResolution {
    /// No display attached
    NoDisplay,
    /// A manual calibration overrides the discovered displays
    Manual(CalibrationRecord),
    /// The target serial is attached
    Found(CalibrationRecord),
    /// The target serial was missing; the camera now targets the first display
    Reassigned {
        previous: Option<String>,
        record: CalibrationRecord,
    },
}

impl TargetResolution {
    /// Calibration the camera now targets
    pub fn calibration(&self) -> Option<&CalibrationRecord> {
        match self {
            TargetResolution::NoDisplay => None,
            TargetResolution::Manual(record) => Some(record),
            TargetResolution::Found(record) => Some(record),
            TargetResolution::Reassigned { record, .. } => Some(record),
        }
    }

    pub fn is_reassigned(&self) -> bool {
        matches!(self, TargetResolution::Reassigned { .. })
    }
}

/// Result of [`HologramCamera::update_calibration`]
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationUpdate {
    pub target: TargetResolution,
    pub frustum: ResolvedFrustum,
    pub quilt: QuiltResolution,
}

/// One hologram camera
#[derive(Debug, Clone)]
pub struct HologramCamera {
    properties: HologramCameraProperties,
    quilt_preset: QuiltPreset,
    custom_quilt: QuiltSettings,
    /// Output index the camera renders to
    target_display: u32,
    /// Serial of the display the camera targets
    target_lkg: Option<String>,
    /// Device emulated while no display is attached
    emulated_device: DeviceType,
    manual_calibration_mode: ManualCalibrationMode,
    calibration_file: Option<PathBuf>,
    /// Last successful load of `calibration_file`
    file_calibration: Option<CalibrationRecord>,
    manual_calibration: Option<CalibrationRecord>,
    /// Vertical field of view in degrees
    field_of_view: f32,
    controller: TransformModeController,
    /// Aspect of the targeted display, or of the emulated target
    display_aspect: f32,
    /// Whether `display_aspect` came from a real display
    attached: bool,
}

impl Default for HologramCamera {
    fn default() -> Self {
        Self::new(DeviceType::default())
    }
}

impl HologramCamera {
    /// Volume-mode camera emulating `emulated_device`
    pub fn new(emulated_device: DeviceType) -> Self {
        Self {
            properties: HologramCameraProperties::default(),
            quilt_preset: QuiltPreset::Automatic,
            custom_quilt: QuiltSettings::default(),
            target_display: 0,
            target_lkg: None,
            emulated_device,
            manual_calibration_mode: ManualCalibrationMode::Disabled,
            calibration_file: None,
            file_calibration: None,
            manual_calibration: None,
            field_of_view: DEFAULT_FIELD_OF_VIEW,
            controller: TransformModeController::new(Self::proportional(DEFAULT_FIELD_OF_VIEW)),
            display_aspect: emulated_device.profile().aspect(),
            attached: false,
        }
    }

    /// Camera-mode camera that keeps the clip planes of a conventional camera.
    ///
    /// The focal plane goes halfway between the clip planes.
    pub fn from_conventional_camera(near: f32, far: f32, fov_degrees: f32) -> Self {
        let mut camera = Self::default();
        camera.set_field_of_view(fov_degrees);
        let planes = CameraParams {
            near_clip_plane: near,
            far_clip_plane: far,
            focal_plane: (near + far) * 0.5,
        };
        camera.properties =
            HologramCameraProperties::from_parts(TransformMode::Camera, VolumeParams::default(), planes);
        tracing::debug!(
            near = camera.properties.camera().near_clip_plane,
            far = camera.properties.camera().far_clip_plane,
            "Converted conventional camera"
        );
        camera
    }

    /// Replacement for a conventional camera.
    ///
    /// Copies `source` unless `use_hologram_defaults` is set or there is no
    /// camera to copy, in which case the result is a default hologram camera.
    pub fn convert_conventional_camera(
        source: Option<ConventionalCamera>,
        use_hologram_defaults: bool,
    ) -> Self {
        match source {
            Some(source) if !use_hologram_defaults => Self::from_conventional_camera(
                source.near_clip_plane,
                source.far_clip_plane,
                source.field_of_view,
            ),
            _ => Self::default(),
        }
    }

    /// Rebuild from persisted parts
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_stored(
        properties: HologramCameraProperties,
        quilt_preset: QuiltPreset,
        custom_quilt: QuiltSettings,
        target_display: u32,
        target_lkg: Option<String>,
        emulated_device: DeviceType,
        field_of_view: f32,
    ) -> Self {
        let mut camera = Self::new(emulated_device);
        camera.properties = properties;
        camera.quilt_preset = quilt_preset;
        camera.custom_quilt = custom_quilt;
        camera.target_display = target_display;
        camera.target_lkg = target_lkg.filter(|s| !s.is_empty());
        camera.set_field_of_view(field_of_view);
        camera.refresh_emulated_aspect();
        camera
    }

    fn proportional(fov_degrees: f32) -> FrustumResolver {
        FrustumResolver::new(Arc::new(ProportionalDepth::new(fov_degrees)))
    }

    // ───────────────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────────────

    pub fn properties(&self) -> &HologramCameraProperties {
        &self.properties
    }

    pub fn transform_mode(&self) -> TransformMode {
        self.properties.transform_mode()
    }

    pub fn quilt_preset(&self) -> QuiltPreset {
        self.quilt_preset
    }

    pub fn custom_quilt(&self) -> QuiltSettings {
        self.custom_quilt
    }

    pub fn target_display(&self) -> u32 {
        self.target_display
    }

    pub fn target_lkg(&self) -> Option<&str> {
        self.target_lkg.as_deref()
    }

    pub fn emulated_device(&self) -> DeviceType {
        self.emulated_device
    }

    /// Device stood in for while no display is attached: the named quilt
    /// preset's device, else the emulated device
    pub fn emulated_target(&self) -> DeviceType {
        self.quilt_preset.device().unwrap_or(self.emulated_device)
    }

    pub fn manual_calibration_mode(&self) -> ManualCalibrationMode {
        self.manual_calibration_mode
    }

    pub fn calibration_file(&self) -> Option<&Path> {
        self.calibration_file.as_deref()
    }

    /// Hand-entered calibration, used in [`ManualCalibrationMode::UseManualSettings`]
    pub fn manual_calibration(&self) -> Option<&CalibrationRecord> {
        self.manual_calibration.as_ref()
    }

    /// Calibration that replaces the discovered displays, if the manual mode
    /// provides one
    pub fn calibration_override(&self) -> Option<&CalibrationRecord> {
        match self.manual_calibration_mode {
            ManualCalibrationMode::Disabled => None,
            ManualCalibrationMode::UseCalibrationFile => self.file_calibration.as_ref(),
            ManualCalibrationMode::UseManualSettings => self.manual_calibration.as_ref(),
        }
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// Aspect geometry is currently resolved at
    pub fn display_aspect(&self) -> f32 {
        self.display_aspect
    }

    // ───────────────────────────────────────────────────────────────────────
    // Setters
    // ───────────────────────────────────────────────────────────────────────

    /// Change the quilt preset. A named preset also becomes the emulated
    /// target while no display is attached.
    pub fn set_quilt_preset(&mut self, preset: QuiltPreset) {
        self.quilt_preset = preset;
        self.refresh_emulated_aspect();
    }

    /// Toggle between custom render settings and automatic
    pub fn use_custom_render_settings(&mut self, use_custom: bool) {
        self.set_quilt_preset(QuiltPreset::from_custom_toggle(use_custom));
    }

    pub fn set_custom_quilt(&mut self, quilt: QuiltSettings) {
        self.custom_quilt = quilt.sanitized();
    }

    pub fn set_target_display(&mut self, index: u32) {
        self.target_display = index;
    }

    pub fn set_target_lkg(&mut self, serial: Option<String>) {
        self.target_lkg = serial.filter(|s| !s.is_empty());
    }

    /// Change the emulated device. Only affects geometry while no display is
    /// attached and no named preset picks the device.
    pub fn set_emulated_device(&mut self, device: DeviceType) {
        self.emulated_device = device;
        self.refresh_emulated_aspect();
    }

    /// Change the field of view.
    ///
    /// Depth scaling goes back to the proportional model at the new angle,
    /// replacing any scaling installed with [`set_depth_scaling`](Self::set_depth_scaling).
    pub fn set_field_of_view(&mut self, fov_degrees: f32) {
        let fov = ProportionalDepth::new(fov_degrees).fov_degrees;
        self.field_of_view = fov;
        self.controller = TransformModeController::new(Self::proportional(fov));
    }

    /// Replace the depth scaling used for volume mode.
    ///
    /// Stays in effect until the next [`set_field_of_view`](Self::set_field_of_view).
    pub fn set_depth_scaling(&mut self, scaling: Arc<dyn DepthScaling>) {
        self.controller = TransformModeController::new(FrustumResolver::new(scaling));
    }

    /// Choose where the calibration comes from. Takes effect on the next
    /// [`update_calibration`](Self::update_calibration).
    pub fn set_manual_calibration_mode(&mut self, mode: ManualCalibrationMode) {
        self.manual_calibration_mode = mode;
    }

    /// Point the camera at a calibration file and load it.
    ///
    /// The path is kept even when loading fails; the file then provides no
    /// calibration until [`reload_calibration_file`](Self::reload_calibration_file)
    /// succeeds.
    pub fn set_calibration_file(&mut self, path: Option<PathBuf>) -> Result<(), CalibrationLoadError> {
        self.calibration_file = path;
        self.reload_calibration_file()
    }

    /// Read the calibration file again
    pub fn reload_calibration_file(&mut self) -> Result<(), CalibrationLoadError> {
        self.file_calibration = None;
        let Some(path) = self.calibration_file.as_deref() else {
            return Ok(());
        };
        let record = CalibrationRecord::load_from_file(path)?;
        tracing::info!("Loaded calibration {} from {}", record, path.display());
        self.file_calibration = Some(record);
        Ok(())
    }

    /// Set the hand-entered calibration; invalid records are rejected
    pub fn set_manual_calibration(
        &mut self,
        record: Option<CalibrationRecord>,
    ) -> Result<(), CalibrationLoadError> {
        if let Some(record) = &record {
            record.validate()?;
        }
        self.manual_calibration = record;
        Ok(())
    }

    fn refresh_emulated_aspect(&mut self) {
        if !self.attached {
            self.display_aspect = self.emulated_target().profile().aspect();
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Resolution
    // ───────────────────────────────────────────────────────────────────────

    /// Match the target serial against `registry`, reassigning to the first
    /// display when it is gone.
    ///
    /// An active manual calibration wins over the registry and leaves the
    /// target serial alone.
    pub fn resolve_target(&mut self, registry: &CalibrationRegistry) -> TargetResolution {
        if let Some(record) = self.calibration_override() {
            return TargetResolution::Manual(record.clone());
        }
        if let Some(record) = self.target_lkg.as_deref().and_then(|s| registry.find(s)) {
            return TargetResolution::Found(record);
        }

        match registry.first() {
            Some(record) => {
                let previous = self.target_lkg.replace(record.serial.clone());
                match &previous {
                    Some(old) => tracing::warn!(
                        "Display '{}' not found, reassigning camera to '{}'",
                        old,
                        record.serial
                    ),
                    None => tracing::info!("Camera assigned to display '{}'", record.serial),
                }
                TargetResolution::Reassigned { previous, record }
            }
            None => TargetResolution::NoDisplay,
        }
    }

    /// Frustum at the current display aspect
    pub fn resolve_frustum(&self) -> ResolvedFrustum {
        self.controller.resolver().resolve(&self.properties, self.display_aspect)
    }

    /// Frustum at an explicit aspect
    pub fn resolve_frustum_at(&self, aspect: f32) -> ResolvedFrustum {
        self.controller.resolver().resolve(&self.properties, aspect)
    }

    /// Frustum for a given display, falling back to the emulated target
    pub fn resolve_frustum_for(&self, calibration: Option<&CalibrationRecord>) -> ResolvedFrustum {
        self.controller.resolver().resolve_for_display(
            &self.properties,
            calibration,
            self.emulated_target().profile().aspect(),
        )
    }

    /// What this camera asks of the quilt resolver
    pub fn quilt_request(&self) -> QuiltRequest {
        QuiltRequest {
            preset: self.quilt_preset,
            custom: self.custom_quilt,
            emulated_device: self.emulated_device,
        }
    }

    /// Render target for the current target display
    pub fn resolve_quilt(
        &self,
        resolver: &QuiltPresetResolver,
        registry: &CalibrationRegistry,
    ) -> QuiltResolution {
        let request = self.quilt_request();
        if let Some(record) = self.calibration_override() {
            return resolver.resolve(&request, Some(record));
        }
        match self.target_lkg.as_deref() {
            Some(serial) => resolver.resolve_cached(registry, serial, &request),
            None => resolver.resolve(&request, None),
        }
    }

    /// Re-resolve target, frustum and quilt after the calibration set changed
    pub fn update_calibration(
        &mut self,
        registry: &CalibrationRegistry,
        quilt_resolver: &QuiltPresetResolver,
        listener: &mut dyn CameraListener,
    ) -> CalibrationUpdate {
        let target = self.resolve_target(registry);
        match target.calibration() {
            Some(record) => {
                self.display_aspect = record.aspect();
                self.attached = true;
            }
            None => {
                self.attached = false;
                self.refresh_emulated_aspect();
            }
        }

        let frustum = self.resolve_frustum_for(target.calibration());
        let request = self.quilt_request();
        let quilt = match &target {
            TargetResolution::NoDisplay => quilt_resolver.resolve(&request, None),
            TargetResolution::Manual(record) => quilt_resolver.resolve(&request, Some(record)),
            TargetResolution::Found(record) | TargetResolution::Reassigned { record, .. } => {
                quilt_resolver.resolve_cached(registry, &record.serial, &request)
            }
        };

        listener.geometry_changed(&frustum);
        listener.quilt_changed(&quilt);
        CalibrationUpdate {
            target,
            frustum,
            quilt,
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Editing
    // ───────────────────────────────────────────────────────────────────────

    /// Switch transform mode; see [`TransformModeController::transition`]
    pub fn set_transform_mode(
        &mut self,
        mode: TransformMode,
        listener: &mut dyn CameraListener,
    ) -> Option<ModeTransition> {
        self.controller
            .transition(&mut self.properties, mode, self.display_aspect, listener)
    }

    /// Edit the authoritative field group, then re-resolve and propagate
    pub fn edit<R>(
        &mut self,
        listener: &mut dyn CameraListener,
        f: impl FnOnce(ModeFieldsMut<'_>) -> R,
    ) -> R {
        let before = self.properties.clone();
        let out = f(self.properties.edit());
        if self.properties != before {
            listener.geometry_changed(&self.resolve_frustum());
        }
        out
    }

    /// Apply a drag of `handle` to `world_point`.
    ///
    /// Ignored (returns false) outside volume mode or while the size follows
    /// the transform scale.
    pub fn apply_size_drag(
        &mut self,
        handle: SizeHandle,
        frame: &HandleFrame,
        world_point: Vec3,
        listener: &mut dyn CameraListener,
    ) -> bool {
        let size = dragged_size(handle, frame.to_local(world_point));
        let applied = match self.properties.edit_volume() {
            Some(mut volume) => volume.set_size(size),
            None => false,
        };
        if applied {
            listener.geometry_changed(&self.resolve_frustum());
        }
        applied
    }

    /// Follow the transform scale while the size mode is [`SizeMode::ScaleSetsSize`]
    pub fn sync_scale(&mut self, scale: f32, listener: &mut dyn CameraListener) -> bool {
        if self.properties.volume().size_mode != SizeMode::ScaleSetsSize {
            return false;
        }
        let changed = self.properties.sync_scale(scale);
        if changed {
            listener.geometry_changed(&self.resolve_frustum());
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::controller::RecordingListener;
    use crate::quilt::QuiltSource;
    use glam::Quat;

    fn registry_with(records: Vec<CalibrationRecord>) -> CalibrationRegistry {
        let registry = CalibrationRegistry::new();
        registry.replace(records);
        registry
    }

    #[test]
    fn test_missing_target_reassigns_to_first() {
        let registry = registry_with(vec![
            CalibrationRecord::new("A", 1536, 2048, "Portrait"),
            CalibrationRecord::new("B", 3840, 2160, "16in"),
        ]);
        let mut camera = HologramCamera::default();
        camera.set_target_lkg(Some("B".into()));
        assert!(matches!(camera.resolve_target(&registry), TargetResolution::Found(_)));

        registry.replace(vec![CalibrationRecord::new("A", 1536, 2048, "Portrait")]);
        let target = camera.resolve_target(&registry);
        assert!(target.is_reassigned());
        assert_eq!(camera.target_lkg(), Some("A"));
        match target {
            TargetResolution::Reassigned { previous, record } => {
                assert_eq!(previous.as_deref(), Some("B"));
                assert_eq!(record.serial, "A");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_no_display_keeps_target() {
        let registry = CalibrationRegistry::new();
        let mut camera = HologramCamera::default();
        camera.set_target_lkg(Some("gone".into()));
        assert_eq!(camera.resolve_target(&registry), TargetResolution::NoDisplay);
        assert_eq!(camera.target_lkg(), Some("gone"));
    }

    #[test]
    fn test_update_calibration_pushes_outputs() {
        let registry = registry_with(vec![CalibrationRecord::new("A1", 3840, 2160, "Portrait")]);
        let resolver = QuiltPresetResolver::default();
        let mut camera = HologramCamera::default();
        let mut listener = RecordingListener::new();

        let update = camera.update_calibration(&registry, &resolver, &mut listener);
        assert_eq!((update.quilt.width, update.quilt.height), (3840, 2160));
        assert_eq!(update.quilt.source, QuiltSource::Calibration { serial: "A1".into() });
        assert!((camera.display_aspect() - 3840.0 / 2160.0).abs() < 1e-6);
        assert_eq!(listener.last_geometry(), Some(&update.frustum));
        assert_eq!(listener.last_quilt(), Some(&update.quilt));
    }

    #[test]
    fn test_size_drag_only_in_manual_volume_mode() {
        let mut camera = HologramCamera::default();
        let mut listener = RecordingListener::new();
        let frame = HandleFrame::new(Vec3::ZERO, Quat::IDENTITY, 1.0);

        assert!(camera.apply_size_drag(SizeHandle::Up, &frame, Vec3::new(0.0, 2.0, 0.0), &mut listener));
        assert_eq!(camera.properties().volume().size, 2.0);
        assert_eq!(listener.last_geometry().map(|f| f.size), Some(2.0));

        // Dragged through the center
        camera.apply_size_drag(SizeHandle::Up, &frame, Vec3::new(0.0, -1.0, 0.0), &mut listener);
        assert_eq!(camera.properties().volume().size, 0.0);

        camera.set_transform_mode(TransformMode::Camera, &mut listener);
        assert!(!camera.apply_size_drag(SizeHandle::Up, &frame, Vec3::new(0.0, 4.0, 0.0), &mut listener));
        assert_eq!(camera.properties().volume().size, 0.0);
    }

    #[test]
    fn test_scale_sets_size() {
        let mut camera = HologramCamera::default();
        let mut listener = RecordingListener::new();
        assert!(!camera.sync_scale(3.0, &mut listener));

        camera.edit(&mut listener, |fields| {
            if let ModeFieldsMut::Volume(mut volume) = fields {
                volume.set_size_mode(SizeMode::ScaleSetsSize);
            }
        });
        assert!(camera.sync_scale(3.0, &mut listener));
        assert_eq!(camera.properties().volume().size, 3.0);

        let frame = HandleFrame::default();
        assert!(!camera.apply_size_drag(SizeHandle::Right, &frame, Vec3::X, &mut listener));
    }

    #[test]
    fn test_conventional_camera_keeps_planes() {
        let camera = HologramCamera::from_conventional_camera(0.3, 1000.0, 60.0);
        assert_eq!(camera.transform_mode(), TransformMode::Camera);
        let frustum = camera.resolve_frustum();
        assert_eq!(frustum.near_clip_plane, 0.3);
        assert_eq!(frustum.far_clip_plane, 1000.0);
        assert_eq!(camera.field_of_view(), 60.0);
    }

    #[test]
    fn test_conventional_conversion_defaults() {
        let source = ConventionalCamera {
            near_clip_plane: 0.3,
            far_clip_plane: 1000.0,
            field_of_view: 60.0,
        };

        let copied = HologramCamera::convert_conventional_camera(Some(source), false);
        assert_eq!(copied.transform_mode(), TransformMode::Camera);
        assert_eq!(copied.properties().camera().far_clip_plane, 1000.0);

        let defaults = HologramCamera::convert_conventional_camera(Some(source), true);
        assert_eq!(defaults.transform_mode(), TransformMode::Volume);
        assert_eq!(defaults.field_of_view(), DEFAULT_FIELD_OF_VIEW);
        assert_eq!(defaults.properties(), HologramCamera::default().properties());

        let nothing_to_copy = HologramCamera::convert_conventional_camera(None, false);
        assert_eq!(nothing_to_copy.transform_mode(), TransformMode::Volume);
    }

    #[test]
    fn test_named_preset_is_emulated_target_without_display() {
        let registry = CalibrationRegistry::new();
        let resolver = QuiltPresetResolver::default();
        let mut camera = HologramCamera::new(DeviceType::Portrait);
        let mut listener = RecordingListener::new();

        camera.set_quilt_preset(QuiltPreset::Gen2SixtyFive);
        assert_eq!(camera.emulated_target(), DeviceType::Gen2SixtyFive);
        assert!((camera.display_aspect() - 16.0 / 9.0).abs() < 1e-6);

        let update = camera.update_calibration(&registry, &resolver, &mut listener);
        assert_eq!((update.quilt.width, update.quilt.height), (7680, 4320));
        assert_eq!(update.frustum, camera.resolve_frustum());

        // Emulated device only matters again once the preset stops naming one
        camera.set_emulated_device(DeviceType::Go);
        assert!((camera.display_aspect() - 16.0 / 9.0).abs() < 1e-6);
        camera.set_quilt_preset(QuiltPreset::Automatic);
        assert_eq!(camera.emulated_target(), DeviceType::Go);
        assert!((camera.display_aspect() - 1440.0 / 2560.0).abs() < 1e-6);
    }

    #[test]
    fn test_manual_calibration_overrides_registry() {
        let registry = registry_with(vec![CalibrationRecord::new("A", 1536, 2048, "Portrait")]);
        let resolver = QuiltPresetResolver::default();
        let mut camera = HologramCamera::default();
        let mut listener = RecordingListener::new();
        camera.update_calibration(&registry, &resolver, &mut listener);
        assert_eq!(camera.target_lkg(), Some("A"));

        let manual = CalibrationRecord::new("BENCH", 3840, 2160, "16in");
        camera.set_manual_calibration(Some(manual.clone())).unwrap();
        // Stored but inactive until the mode selects it
        assert!(camera.calibration_override().is_none());

        camera.set_manual_calibration_mode(ManualCalibrationMode::UseManualSettings);
        let update = camera.update_calibration(&registry, &resolver, &mut listener);
        assert_eq!(update.target, TargetResolution::Manual(manual.clone()));
        assert_eq!((update.quilt.width, update.quilt.height), (3840, 2160));
        assert_eq!(update.quilt.view_count, DeviceType::Gen2Sixteen.profile().view_count());
        assert!((camera.display_aspect() - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(camera.target_lkg(), Some("A"));
        assert_eq!(camera.resolve_quilt(&resolver, &registry), update.quilt);

        camera.set_manual_calibration_mode(ManualCalibrationMode::Disabled);
        let update = camera.update_calibration(&registry, &resolver, &mut listener);
        assert!(matches!(update.target, TargetResolution::Found(ref r) if r.serial == "A"));
    }

    #[test]
    fn test_invalid_manual_calibration_rejected() {
        let mut camera = HologramCamera::default();
        let err = camera
            .set_manual_calibration(Some(CalibrationRecord::new("X", 0, 2160, "16in")))
            .unwrap_err();
        assert!(matches!(err, CalibrationLoadError::Invalid(_)));
        assert!(camera.manual_calibration().is_none());
    }

    #[test]
    fn test_calibration_file_override() {
        let path = std::env::temp_dir().join(format!("holo-camera-calibration-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"serial": "FILE-1", "screenW": 1440, "screenH": 2560, "deviceType": "Go"}"#,
        )
        .unwrap();

        let registry = CalibrationRegistry::new();
        let resolver = QuiltPresetResolver::default();
        let mut camera = HologramCamera::default();
        let mut listener = RecordingListener::new();
        camera.set_manual_calibration_mode(ManualCalibrationMode::UseCalibrationFile);
        camera.set_calibration_file(Some(path.clone())).unwrap();

        let update = camera.update_calibration(&registry, &resolver, &mut listener);
        assert_eq!(update.target.calibration().map(|r| r.serial.as_str()), Some("FILE-1"));
        assert_eq!((update.quilt.width, update.quilt.height), (1440, 2560));

        // A file that stops loading no longer overrides
        std::fs::write(&path, "not json").unwrap();
        assert!(camera.reload_calibration_file().is_err());
        assert_eq!(camera.calibration_file(), Some(path.as_path()));
        let update = camera.update_calibration(&registry, &resolver, &mut listener);
        assert_eq!(update.target, TargetResolution::NoDisplay);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_field_of_view_replaces_custom_scaling() {
        struct Fixed;
        impl DepthScaling for Fixed {
            fn volume_to_planes(&self, _: &VolumeParams, _: f32) -> crate::geometry::ClipDistances {
                crate::geometry::ClipDistances {
                    near: 1.0,
                    far: 3.0,
                    focal: 2.0,
                }
            }
            fn planes_to_size(&self, _: &CameraParams, _: f32) -> f32 {
                1.0
            }
        }

        let mut camera = HologramCamera::default();
        camera.set_depth_scaling(Arc::new(Fixed));
        assert_eq!(camera.resolve_frustum().focal_plane, 2.0);

        camera.set_field_of_view(30.0);
        let proportional = FrustumResolver::new(Arc::new(ProportionalDepth::new(30.0)))
            .resolve(camera.properties(), camera.display_aspect());
        assert_eq!(camera.resolve_frustum(), proportional);
    }

    #[test]
    fn test_emulated_device_sets_aspect_without_display() {
        let mut camera = HologramCamera::new(DeviceType::Portrait);
        assert_eq!(camera.display_aspect(), 0.75);
        camera.set_emulated_device(DeviceType::Gen2Sixteen);
        assert!((camera.display_aspect() - 16.0 / 9.0).abs() < 1e-6);
    }
}
