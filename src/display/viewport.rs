//! Game viewports
//!
//! A viewport is any downstream view that renders at the hologram output
//! resolution and has to be told when that resolution changes.

use std::sync::Arc;

use parking_lot::Mutex;

/// Errors a viewport can report when resized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewportError {
    #[error("viewport closed")]
    Closed,
    #[error("resolution rejected: {0}")]
    Rejected(String),
}

/// A view bound to one output display
pub trait GameViewport: Send {
    /// Name for logs
    fn label(&self) -> String;

    /// Output display index this viewport shows
    fn target_display(&self) -> u32;

    /// Apply a new output resolution
    fn set_resolution(
        &mut self,
        width: u32,
        height: u32,
        device_type_name: &str,
    ) -> Result<(), ViewportError>;
}

/// Handle returned by [`ViewportRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewportId(u64);

/// Registered viewports, in registration order
#[derive(Default)]
pub struct ViewportRegistry {
    viewports: Vec<(ViewportId, Box<dyn GameViewport>)>,
    next_id: u64,
}

impl ViewportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewport
    pub fn register(&mut self, viewport: Box<dyn GameViewport>) -> ViewportId {
        self.next_id += 1;
        let id = ViewportId(self.next_id);
        tracing::debug!("Viewport registered: {} ({:?})", viewport.label(), id);
        self.viewports.push((id, viewport));
        id
    }

    /// Remove a viewport. Returns false if it was not registered.
    pub fn unregister(&mut self, id: ViewportId) -> bool {
        let before = self.viewports.len();
        self.viewports.retain(|(vid, _)| *vid != id);
        self.viewports.len() != before
    }

    pub fn len(&self) -> usize {
        self.viewports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewports.is_empty()
    }

    /// Registered ids, in registration order
    pub fn ids(&self) -> Vec<ViewportId> {
        self.viewports.iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = (ViewportId, &mut Box<dyn GameViewport>)> + '_ {
        self.viewports.iter_mut().map(|(id, v)| (*id, v))
    }

    pub(crate) fn remove_all(&mut self, ids: &[ViewportId]) {
        self.viewports.retain(|(id, _)| !ids.contains(id));
    }
}

impl std::fmt::Debug for ViewportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportRegistry")
            .field("len", &self.viewports.len())
            .finish()
    }
}

/// Observable state of a [`TrackedViewport`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewportState {
    pub label: String,
    pub target_display: u32,
    /// Last resolution applied
    pub resolution: Option<(u32, u32)>,
    /// Device type name that came with the last resolution
    pub device_type_name: String,
    /// Number of resolution updates received
    pub updates: u32,
    /// A closed viewport fails every update
    pub closed: bool,
}

/// In-process viewport whose state stays readable after registration
#[derive(Debug, Clone)]
pub struct TrackedViewport {
    state: Arc<Mutex<ViewportState>>,
}

impl TrackedViewport {
    pub fn new(label: impl Into<String>, target_display: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewportState {
                label: label.into(),
                target_display,
                ..Default::default()
            })),
        }
    }

    /// Current state
    pub fn state(&self) -> ViewportState {
        self.state.lock().clone()
    }

    /// Mark the viewport closed
    pub fn close(&self) {
        self.state.lock().closed = true;
    }
}

impl GameViewport for TrackedViewport {
    fn label(&self) -> String {
        self.state.lock().label.clone()
    }

    fn target_display(&self) -> u32 {
        self.state.lock().target_display
    }

    fn set_resolution(
        &mut self,
        width: u32,
        height: u32,
        device_type_name: &str,
    ) -> Result<(), ViewportError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ViewportError::Closed);
        }
        if width == 0 || height == 0 {
            return Err(ViewportError::Rejected(format!("{}x{}", width, height)));
        }
        state.resolution = Some((width, height));
        state.device_type_name = device_type_name.to_string();
        state.updates += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_unregister() {
        let mut registry = ViewportRegistry::new();
        let a = registry.register(Box::new(TrackedViewport::new("Game", 0)));
        let b = registry.register(Box::new(TrackedViewport::new("Preview", 1)));
        assert_eq!(registry.ids(), vec![a, b]);
        assert!(registry.unregister(a));
        assert!(!registry.unregister(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_tracked_viewport_state_is_shared() {
        let viewport = TrackedViewport::new("Game", 0);
        let mut boxed: Box<dyn GameViewport> = Box::new(viewport.clone());
        boxed.set_resolution(1536, 2048, "Portrait").unwrap();
        assert_eq!(viewport.state().resolution, Some((1536, 2048)));

        viewport.close();
        assert_eq!(boxed.set_resolution(1, 1, ""), Err(ViewportError::Closed));
    }
}
