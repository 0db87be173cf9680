//! Hologram camera properties
//!
//! The geometry of a hologram camera is driven either by a volume (size plus
//! near/far clip factors) or by conventional clip planes. Both field groups
//! are stored so switching modes never loses values, but only the group of
//! the active [`TransformMode`] can be edited.

use serde::{Deserialize, Serialize};

/// Smallest allowed clip factor
pub const MIN_CLIP_FACTOR: f32 = 0.001;
/// Largest allowed clip factor
pub const MAX_CLIP_FACTOR: f32 = 0.999;
/// Minimum gap between near and far clip factors
pub const MIN_CLIP_FACTOR_GAP: f32 = 0.001;
/// Largest accepted volume size
pub const MAX_SIZE: f32 = 10_000.0;
/// Closest allowed near clip plane
pub const MIN_NEAR_PLANE: f32 = 0.01;
/// Farthest allowed far clip plane
pub const MAX_FAR_PLANE: f32 = 100_000.0;
/// Minimum distance between near and far clip planes
pub const MIN_PLANE_GAP: f32 = 0.01;

/// Clamp `value` into `[min, max]`, sending NaN to `min`.
///
/// Never panics: if rounding pushes `min` above `max`, `max` wins.
pub(crate) fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min.min(max)
    } else {
        value.max(min).min(max)
    }
}

/// Which parameter group drives the frustum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransformMode {
    /// Size and clip factors are authoritative
    #[default]
    Volume,
    /// Near/far/focal planes are authoritative
    Camera,
}

impl TransformMode {
    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            TransformMode::Volume => "Volume",
            TransformMode::Camera => "Camera",
        }
    }

    /// Get all modes for iteration
    pub fn all() -> &'static [TransformMode] {
        &[TransformMode::Volume, TransformMode::Camera]
    }
}

/// How the volume size is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SizeMode {
    /// Size follows the camera's transform scale and is not user-editable
    ScaleSetsSize,
    /// Size is set directly
    #[default]
    ManualSize,
}

/// Fields of the camera that a UI can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraField {
    TransformMode,
    Size,
    SizeMode,
    NearClipFactor,
    FarClipFactor,
    NearClipPlane,
    FarClipPlane,
    FocalPlane,
}

const VOLUME_FIELDS: &[CameraField] = &[
    CameraField::TransformMode,
    CameraField::Size,
    CameraField::SizeMode,
    CameraField::NearClipFactor,
    CameraField::FarClipFactor,
];

const CAMERA_FIELDS: &[CameraField] = &[
    CameraField::TransformMode,
    CameraField::NearClipPlane,
    CameraField::FarClipPlane,
    CameraField::FocalPlane,
];

// ═══════════════════════════════════════════════════════════════════════════════
// VOLUME PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters authoritative in [`TransformMode::Volume`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeParams {
    /// Half-extent of the viewing volume along its smaller screen axis
    pub size: f32,
    /// Whether size is set manually or by transform scale
    pub size_mode: SizeMode,
    /// Near clip position, as a fraction of the depth range
    pub near_clip_factor: f32,
    /// Far clip position, as a fraction of the depth range
    pub far_clip_factor: f32,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            size: 5.0,
            size_mode: SizeMode::ManualSize,
            near_clip_factor: 0.25,
            far_clip_factor: 0.75,
        }
    }
}

impl VolumeParams {
    /// Copy with every value moved into its valid range.
    ///
    /// Guarantees `0 <= size` and `0 < near_clip_factor < far_clip_factor < 1`.
    pub fn clamped(&self) -> Self {
        let near_clip_factor = clamp_finite(
            self.near_clip_factor,
            MIN_CLIP_FACTOR,
            MAX_CLIP_FACTOR - MIN_CLIP_FACTOR_GAP,
        );
        let far_clip_factor = clamp_finite(
            self.far_clip_factor,
            near_clip_factor + MIN_CLIP_FACTOR_GAP,
            MAX_CLIP_FACTOR,
        );
        Self {
            size: clamp_finite(self.size, 0.0, MAX_SIZE),
            size_mode: self.size_mode,
            near_clip_factor,
            far_clip_factor,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CAMERA PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters authoritative in [`TransformMode::Camera`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    /// Distance to the near clip plane
    pub near_clip_plane: f32,
    /// Distance to the far clip plane
    pub far_clip_plane: f32,
    /// Distance to the plane that appears at the display surface
    pub focal_plane: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            near_clip_plane: 5.0,
            far_clip_plane: 15.0,
            focal_plane: 10.0,
        }
    }
}

impl CameraParams {
    /// Copy with every value moved into its valid range.
    ///
    /// Guarantees `0 < near_clip_plane < far_clip_plane` and
    /// `near_clip_plane <= focal_plane <= far_clip_plane`.
    pub fn clamped(&self) -> Self {
        let near_clip_plane = clamp_finite(
            self.near_clip_plane,
            MIN_NEAR_PLANE,
            MAX_FAR_PLANE - MIN_PLANE_GAP,
        );
        let far_clip_plane = clamp_finite(
            self.far_clip_plane,
            near_clip_plane + MIN_PLANE_GAP,
            MAX_FAR_PLANE,
        );
        let focal_plane = clamp_finite(self.focal_plane, near_clip_plane, far_clip_plane);
        Self {
            near_clip_plane,
            far_clip_plane,
            focal_plane,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODE-GATED VIEWS
// ═══════════════════════════════════════════════════════════════════════════════

/// Read access to the authoritative field group
#[derive(Debug, Clone, Copy)]
pub enum ModeFields<'a> {
    Volume(&'a VolumeParams),
    Camera(&'a CameraParams),
}

/// Write access to the authoritative field group
pub enum ModeFieldsMut<'a> {
    Volume(VolumeEdit<'a>),
    Camera(CameraEdit<'a>),
}

/// Editor for volume parameters. Every setter clamps.
pub struct VolumeEdit<'a> {
    params: &'a mut VolumeParams,
}

impl VolumeEdit<'_> {
    /// Current values
    pub fn get(&self) -> &VolumeParams {
        self.params
    }

    /// Set the size. Refused (returns false) when the size follows the transform scale.
    pub fn set_size(&mut self, size: f32) -> bool {
        if self.params.size_mode == SizeMode::ScaleSetsSize {
            return false;
        }
        self.params.size = clamp_finite(size, 0.0, MAX_SIZE);
        true
    }

    /// Set how size is determined
    pub fn set_size_mode(&mut self, size_mode: SizeMode) {
        self.params.size_mode = size_mode;
    }

    /// Set the near clip factor, kept below the far clip factor
    pub fn set_near_clip_factor(&mut self, factor: f32) {
        let far = self.params.far_clip_factor;
        self.params.near_clip_factor =
            clamp_finite(factor, MIN_CLIP_FACTOR, far - MIN_CLIP_FACTOR_GAP);
        *self.params = self.params.clamped();
    }

    /// Set the far clip factor, kept above the near clip factor
    pub fn set_far_clip_factor(&mut self, factor: f32) {
        let near = self.params.near_clip_factor;
        self.params.far_clip_factor =
            clamp_finite(factor, near + MIN_CLIP_FACTOR_GAP, MAX_CLIP_FACTOR);
        *self.params = self.params.clamped();
    }
}

/// Editor for camera parameters. Every setter clamps.
pub struct CameraEdit<'a> {
    params: &'a mut CameraParams,
}

impl CameraEdit<'_> {
    /// Current values
    pub fn get(&self) -> &CameraParams {
        self.params
    }

    /// Set the near plane, kept in front of the far plane
    pub fn set_near_clip_plane(&mut self, near: f32) {
        let far = self.params.far_clip_plane;
        self.params.near_clip_plane = clamp_finite(near, MIN_NEAR_PLANE, far - MIN_PLANE_GAP);
        *self.params = self.params.clamped();
    }

    /// Set the far plane, kept behind the near plane
    pub fn set_far_clip_plane(&mut self, far: f32) {
        let near = self.params.near_clip_plane;
        self.params.far_clip_plane = clamp_finite(far, near + MIN_PLANE_GAP, MAX_FAR_PLANE);
        *self.params = self.params.clamped();
    }

    /// Set the focal plane, kept between the clip planes
    pub fn set_focal_plane(&mut self, focal: f32) {
        self.params.focal_plane = focal;
        *self.params = self.params.clamped();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Geometry properties of one hologram camera
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HologramCameraProperties {
    mode: TransformMode,
    volume: VolumeParams,
    camera: CameraParams,
}

impl HologramCameraProperties {
    /// Build from stored parts, clamping both groups
    pub fn from_parts(mode: TransformMode, volume: VolumeParams, camera: CameraParams) -> Self {
        Self {
            mode,
            volume: volume.clamped(),
            camera: camera.clamped(),
        }
    }

    /// Volume-driven properties
    pub fn volume_mode(volume: VolumeParams) -> Self {
        Self::from_parts(TransformMode::Volume, volume, CameraParams::default())
    }

    /// Plane-driven properties
    pub fn camera_mode(camera: CameraParams) -> Self {
        Self::from_parts(TransformMode::Camera, VolumeParams::default(), camera)
    }

    /// Active transform mode
    pub fn transform_mode(&self) -> TransformMode {
        self.mode
    }

    /// Volume group, including retained values while in camera mode
    pub fn volume(&self) -> &VolumeParams {
        &self.volume
    }

    /// Camera group, including retained values while in volume mode
    pub fn camera(&self) -> &CameraParams {
        &self.camera
    }

    /// The authoritative field group
    pub fn authoritative(&self) -> ModeFields<'_> {
        match self.mode {
            TransformMode::Volume => ModeFields::Volume(&self.volume),
            TransformMode::Camera => ModeFields::Camera(&self.camera),
        }
    }

    /// Edit the authoritative field group
    pub fn edit(&mut self) -> ModeFieldsMut<'_> {
        match self.mode {
            TransformMode::Volume => ModeFieldsMut::Volume(VolumeEdit {
                params: &mut self.volume,
            }),
            TransformMode::Camera => ModeFieldsMut::Camera(CameraEdit {
                params: &mut self.camera,
            }),
        }
    }

    /// Edit volume parameters, if they are authoritative
    pub fn edit_volume(&mut self) -> Option<VolumeEdit<'_>> {
        match self.edit() {
            ModeFieldsMut::Volume(edit) => Some(edit),
            ModeFieldsMut::Camera(_) => None,
        }
    }

    /// Edit camera parameters, if they are authoritative
    pub fn edit_camera(&mut self) -> Option<CameraEdit<'_>> {
        match self.edit() {
            ModeFieldsMut::Camera(edit) => Some(edit),
            ModeFieldsMut::Volume(_) => None,
        }
    }

    /// Switch the authoritative group. Values of both groups are kept.
    pub(crate) fn set_transform_mode(&mut self, mode: TransformMode) {
        self.mode = mode;
    }

    /// Follow the transform scale when in volume mode with [`SizeMode::ScaleSetsSize`].
    ///
    /// Returns whether the size changed.
    pub fn sync_scale(&mut self, scale: f32) -> bool {
        if self.mode != TransformMode::Volume || self.volume.size_mode != SizeMode::ScaleSetsSize {
            return false;
        }
        let size = clamp_finite(scale.abs(), 0.0, MAX_SIZE);
        if size == self.volume.size {
            return false;
        }
        self.volume.size = size;
        true
    }

    /// Clamp both groups in place
    pub fn validate(&mut self) {
        self.volume = self.volume.clamped();
        self.camera = self.camera.clamped();
    }

    /// Fields shown for the active mode
    pub fn visible_fields(&self) -> &'static [CameraField] {
        match self.mode {
            TransformMode::Volume => VOLUME_FIELDS,
            TransformMode::Camera => CAMERA_FIELDS,
        }
    }

    /// Whether a UI may edit `field` right now
    pub fn is_editable(&self, field: CameraField) -> bool {
        if !self.visible_fields().contains(&field) {
            return false;
        }
        !(field == CameraField::Size && self.volume.size_mode == SizeMode::ScaleSetsSize)
    }
}
