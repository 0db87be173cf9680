//! Frustum resolution
//!
//! Turns [`HologramCameraProperties`] into the clip distances, focal distance
//! and size the multi-view renderer needs. The mapping from a volume to clip
//! distances is device dependent, so it sits behind the [`DepthScaling`]
//! trait; [`ProportionalDepth`] is the stand-in used when no device-specific
//! scaling is installed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationRecord;
use crate::camera::properties::{
    clamp_finite, CameraParams, HologramCameraProperties, ModeFields, VolumeParams, MAX_SIZE,
};

/// Smallest size used when deriving planes, so a zero-size volume still has depth
pub const MIN_RESOLVED_SIZE: f32 = 0.001;

/// Aspect used when the supplied one is unusable
const FALLBACK_ASPECT: f32 = 1.0;

/// Final per-view frustum parameters. Transient; recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFrustum {
    pub near_clip_plane: f32,
    pub far_clip_plane: f32,
    pub focal_plane: f32,
    pub size: f32,
    pub aspect: f32,
}

impl ResolvedFrustum {
    /// Depth between the clip planes
    pub fn depth(&self) -> f32 {
        self.far_clip_plane - self.near_clip_plane
    }
}

/// Clip and focal distances derived from a volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipDistances {
    pub near: f32,
    pub far: f32,
    pub focal: f32,
}

/// Device-dependent conversion between a volume and clip distances.
///
/// Implementations may return anything; the resolver clamps the result so
/// `0 < near < far` always holds.
pub trait DepthScaling: Send + Sync {
    /// Clip distances for an (already clamped) volume at the given aspect
    fn volume_to_planes(&self, volume: &VolumeParams, aspect: f32) -> ClipDistances;

    /// Volume size implied by (already clamped) clip planes at the given aspect
    fn planes_to_size(&self, camera: &CameraParams, aspect: f32) -> f32;
}

/// Proportional depth model.
///
/// The focal plane sits where the volume's smaller half-extent fills the
/// vertical field of view; near and far sit at `2 * focal * factor`, so the
/// clip factors split the range `[0, 2 * focal]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProportionalDepth {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
}

impl Default for ProportionalDepth {
    fn default() -> Self {
        Self { fov_degrees: 14.0 }
    }
}

impl ProportionalDepth {
    /// Create with the given vertical field of view (degrees)
    pub fn new(fov_degrees: f32) -> Self {
        Self {
            fov_degrees: clamp_finite(fov_degrees, 1.0, 179.0),
        }
    }

    /// Half-extent of the smaller screen axis at distance 1
    fn unit_half_extent(&self, aspect: f32) -> f32 {
        let half_fov = clamp_finite(self.fov_degrees, 1.0, 179.0).to_radians() * 0.5;
        half_fov.tan() * aspect.min(1.0)
    }
}

impl DepthScaling for ProportionalDepth {
    fn volume_to_planes(&self, volume: &VolumeParams, aspect: f32) -> ClipDistances {
        let focal = volume.size / self.unit_half_extent(aspect);
        ClipDistances {
            near: 2.0 * focal * volume.near_clip_factor,
            far: 2.0 * focal * volume.far_clip_factor,
            focal,
        }
    }

    fn planes_to_size(&self, camera: &CameraParams, aspect: f32) -> f32 {
        camera.focal_plane * self.unit_half_extent(aspect)
    }
}

/// Resolves camera properties into a [`ResolvedFrustum`]
#[derive(Clone)]
pub struct FrustumResolver {
    scaling: Arc<dyn DepthScaling>,
}

impl Default for FrustumResolver {
    fn default() -> Self {
        Self::new(Arc::new(ProportionalDepth::default()))
    }
}

impl std::fmt::Debug for FrustumResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrustumResolver").finish_non_exhaustive()
    }
}

impl FrustumResolver {
    /// Create a resolver using the given depth scaling
    pub fn new(scaling: Arc<dyn DepthScaling>) -> Self {
        Self { scaling }
    }

    /// Resolve the frustum for `props` at `aspect` (width / height).
    ///
    /// Volume mode derives planes from size and clip factors; camera mode
    /// derives size from the planes. Every input is clamped first and the
    /// output always has `0 < near < far`.
    pub fn resolve(&self, props: &HologramCameraProperties, aspect: f32) -> ResolvedFrustum {
        let aspect = sanitize_aspect(aspect);

        match props.authoritative() {
            ModeFields::Volume(volume) => {
                let mut volume = volume.clamped();
                volume.size = volume.size.max(MIN_RESOLVED_SIZE);
                let distances = self.scaling.volume_to_planes(&volume, aspect);
                let planes = CameraParams {
                    near_clip_plane: distances.near,
                    far_clip_plane: distances.far,
                    focal_plane: distances.focal,
                }
                .clamped();
                ResolvedFrustum {
                    near_clip_plane: planes.near_clip_plane,
                    far_clip_plane: planes.far_clip_plane,
                    focal_plane: planes.focal_plane,
                    size: volume.size,
                    aspect,
                }
            }
            ModeFields::Camera(camera) => {
                let planes = camera.clamped();
                let size = clamp_finite(self.scaling.planes_to_size(&planes, aspect), 0.0, MAX_SIZE);
                ResolvedFrustum {
                    near_clip_plane: planes.near_clip_plane,
                    far_clip_plane: planes.far_clip_plane,
                    focal_plane: planes.focal_plane,
                    size,
                    aspect,
                }
            }
        }
    }

    /// Resolve using the aspect of `calibration`, or `fallback_aspect` when
    /// no display is attached
    pub fn resolve_for_display(
        &self,
        props: &HologramCameraProperties,
        calibration: Option<&CalibrationRecord>,
        fallback_aspect: f32,
    ) -> ResolvedFrustum {
        let aspect = calibration.map(|c| c.aspect()).unwrap_or(fallback_aspect);
        let frustum = self.resolve(props, aspect);
        tracing::debug!(
            mode = ?props.transform_mode(),
            near = frustum.near_clip_plane,
            far = frustum.far_clip_plane,
            focal = frustum.focal_plane,
            size = frustum.size,
            aspect = frustum.aspect,
            "Resolved frustum"
        );
        frustum
    }
}

/// Usable aspect: finite and positive, else 1
pub(crate) fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        FALLBACK_ASPECT
    }
}
