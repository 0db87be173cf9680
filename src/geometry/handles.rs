//! Size handles for direct manipulation
//!
//! Four handles sit at `(±size, 0)` and `(0, ±size)` in the camera's
//! right/up plane, stretched horizontally by the display aspect. Dragging a
//! handle sets the size to the projection of the dragged point onto the
//! handle's direction.

use glam::{Mat4, Quat, Vec2, Vec3};

use super::frustum::sanitize_aspect;

/// One of the four size handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeHandle {
    Left,
    Right,
    Down,
    Up,
}

impl SizeHandle {
    /// All handles, in drawing order
    pub const ALL: [SizeHandle; 4] = [
        SizeHandle::Left,
        SizeHandle::Right,
        SizeHandle::Down,
        SizeHandle::Up,
    ];

    /// Unit direction in the handle plane
    pub fn unit(&self) -> Vec2 {
        match self {
            SizeHandle::Left => Vec2::NEG_X,
            SizeHandle::Right => Vec2::X,
            SizeHandle::Down => Vec2::NEG_Y,
            SizeHandle::Up => Vec2::Y,
        }
    }

    /// Handle position in the plane for a given size
    pub fn direction(&self, size: f32) -> Vec2 {
        self.unit() * size
    }
}

/// Placement of the handle plane in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleFrame {
    /// Camera position
    pub position: Vec3,
    /// Camera orientation
    pub rotation: Quat,
    /// Display aspect (width / height)
    pub aspect: f32,
}

impl Default for HandleFrame {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            aspect: 1.0,
        }
    }
}

impl HandleFrame {
    /// Create a frame at `position` with `rotation`
    pub fn new(position: Vec3, rotation: Quat, aspect: f32) -> Self {
        Self {
            position,
            rotation,
            aspect,
        }
    }

    /// Plane-to-world matrix, with x stretched by the aspect
    pub fn matrix(&self) -> Mat4 {
        let aspect = sanitize_aspect(self.aspect);
        Mat4::from_scale_rotation_translation(Vec3::new(aspect, 1.0, 1.0), self.rotation, self.position)
    }

    /// World position of `handle` for a given size
    pub fn handle_world_position(&self, handle: SizeHandle, size: f32) -> Vec3 {
        let local = handle.direction(size);
        self.matrix().transform_point3(local.extend(0.0))
    }

    /// World point expressed in the handle plane (depth dropped)
    pub fn to_local(&self, world: Vec3) -> Vec2 {
        self.matrix().inverse().transform_point3(world).truncate()
    }
}

/// Size implied by dragging `handle` to `local_point`.
///
/// The scalar projection onto the handle direction, never negative.
pub fn dragged_size(handle: SizeHandle, local_point: Vec2) -> f32 {
    let size = local_point.dot(handle.unit()).max(0.0);
    if size.is_finite() {
        size
    } else {
        0.0
    }
}
