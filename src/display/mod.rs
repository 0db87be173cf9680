//! Output display targets and the viewports bound to them

pub mod sync;
pub mod viewport;

pub use sync::{sync_display_target, DisplayTarget, SyncReport};
pub use viewport::{
    GameViewport, TrackedViewport, ViewportError, ViewportId, ViewportRegistry, ViewportState,
};
