//! Hologram camera state
//!
//! Properties, transform mode transitions and the per-camera aggregate.

pub mod controller;
pub mod hologram;
pub mod properties;

pub use controller::{
    CameraEvent, CameraListener, ModeTransition, NoopListener, RecordingListener,
    TransformModeController,
};
pub use hologram::{
    CalibrationUpdate, ConventionalCamera, HologramCamera, ManualCalibrationMode, TargetResolution,
    DEFAULT_FIELD_OF_VIEW,
};
pub use properties::{
    CameraEdit, CameraField, CameraParams, HologramCameraProperties, ModeFields, ModeFieldsMut,
    SizeMode, TransformMode, VolumeEdit, VolumeParams,
};
