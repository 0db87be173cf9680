//! Frustum geometry
//!
//! Resolution of camera properties into concrete frustum values, and the
//! handle-plane math behind interactive size drags.

pub mod frustum;
pub mod handles;

pub use frustum::{
    ClipDistances, DepthScaling, FrustumResolver, ProportionalDepth, ResolvedFrustum,
    MIN_RESOLVED_SIZE,
};
pub use handles::{dragged_size, HandleFrame, SizeHandle};
