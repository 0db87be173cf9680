//! Quilt presets and device profiles

pub mod device;
pub mod preset;

pub use device::{DeviceProfile, DeviceType, QuiltSettings};
pub use preset::{QuiltPreset, QuiltPresetResolver, QuiltRequest, QuiltResolution, QuiltSource};
