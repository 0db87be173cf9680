//! Holo Camera Library
//!
//! Hologram camera geometry and display calibration sync for multi-view
//! lenticular displays: turns a handful of camera parameters into per-view
//! frustum values and render-target sizes, and keeps them in step with the
//! displays the discovery layer reports.

pub mod calibration;
pub mod camera;
pub mod display;
pub mod geometry;
pub mod quilt;
pub mod session;
pub mod settings;
pub mod telemetry;

pub use calibration::{
    CalibrationDiscovery, CalibrationLoadError, CalibrationRecord, CalibrationRegistry,
    DirectoryDiscovery, WaitCancelled,
};
pub use camera::{
    CameraListener, ConventionalCamera, HologramCamera, HologramCameraProperties,
    ManualCalibrationMode, SizeMode, TargetResolution, TransformMode,
};
pub use display::{sync_display_target, GameViewport, SyncReport, ViewportError};
pub use geometry::{DepthScaling, FrustumResolver, ProportionalDepth, ResolvedFrustum};
pub use quilt::{DeviceType, QuiltPreset, QuiltPresetResolver, QuiltResolution, QuiltSettings};
pub use session::HologramSession;
pub use settings::{HologramCameraSettings, HostConfig, SettingsError};
