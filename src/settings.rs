//! Settings persistence
//!
//! Two XML documents: the host configuration in the user's config directory,
//! and per-camera settings files. Both use quick-xml with serde.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::calibration::{CalibrationRecord, CalibrationRegistry};
use crate::camera::{
    CameraParams, HologramCamera, HologramCameraProperties, ManualCalibrationMode, SizeMode,
    TransformMode, VolumeParams, DEFAULT_FIELD_OF_VIEW,
};
use crate::quilt::{DeviceType, QuiltPreset, QuiltSettings};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

// ═══════════════════════════════════════════════════════════════════════════════
// HOST CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Host-wide configuration (stored in config directory)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "HoloCameraConfig")]
pub struct HostConfig {
    /// Device emulated by new cameras while no display is attached
    #[serde(rename = "defaultEmulatedDevice", default)]
    pub default_emulated_device: DeviceType,

    /// How long to wait for the first calibration
    #[serde(rename = "calibrationWaitMs", default = "default_calibration_wait_ms")]
    pub calibration_wait_ms: u64,

    /// Frames between discovery polls while waiting
    #[serde(rename = "pollIntervalFrames", default = "default_poll_interval_frames")]
    pub poll_interval_frames: u32,

    /// Frame rate frame counts are measured in
    #[serde(rename = "targetFps", default = "default_target_fps")]
    pub target_fps: u32,

    /// Frames between a calibration change and the viewport resync
    #[serde(rename = "resyncDelayFrames", default = "default_resync_delay_frames")]
    pub resync_delay_frames: u32,
}

fn default_calibration_wait_ms() -> u64 {
    5000
}

fn default_poll_interval_frames() -> u32 {
    6
}

fn default_target_fps() -> u32 {
    60
}

fn default_resync_delay_frames() -> u32 {
    6
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            default_emulated_device: DeviceType::default(),
            calibration_wait_ms: default_calibration_wait_ms(),
            poll_interval_frames: default_poll_interval_frames(),
            target_fps: default_target_fps(),
            resync_delay_frames: default_resync_delay_frames(),
        }
    }
}

impl HostConfig {
    /// Clamp FPS to valid range (1-240)
    pub fn clamp_fps(&mut self) {
        self.target_fps = self.target_fps.clamp(1, 240);
    }

    /// Wall time of `frames` frames at the target frame rate
    pub fn frames(&self, frames: u32) -> Duration {
        let fps = u64::from(self.target_fps.clamp(1, 240));
        Duration::from_nanos(1_000_000_000 * u64::from(frames) / fps)
    }

    /// Cadence of discovery polls while waiting
    pub fn poll_interval(&self) -> Duration {
        self.frames(self.poll_interval_frames.max(1))
    }

    /// Timeout for the first calibration
    pub fn calibration_wait(&self) -> Duration {
        Duration::from_millis(self.calibration_wait_ms)
    }

    /// Delay before viewports are resynced after a calibration change
    pub fn resync_delay(&self) -> Duration {
        self.frames(self.resync_delay_frames)
    }

    /// Registry polling at this configuration's cadence
    pub fn build_registry(&self) -> CalibrationRegistry {
        CalibrationRegistry::with_poll_interval(self.poll_interval())
    }

    /// Get the config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("HoloCamera");
            p.push("config.xml");
            p
        })
    }

    /// Load from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut config: Self = from_str(&contents).map_err(SettingsError::XmlParse)?;
        config.clamp_fps();
        Ok(config)
    }

    /// Load from the config directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save to an XML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        write_xml(self, path)
    }

    /// Save to the config directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = Self::default_path() else {
            return Err(SettingsError::NoConfigDir);
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SettingsError::Io)?;
        }
        self.save_to_file(&path)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CAMERA SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Persisted state of one hologram camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "HologramCamera")]
pub struct HologramCameraSettings {
    #[serde(rename = "transformMode", default)]
    pub transform_mode: TransformMode,

    #[serde(rename = "size")]
    pub size: f32,

    #[serde(rename = "sizeMode", default)]
    pub size_mode: SizeMode,

    #[serde(rename = "nearClipFactor")]
    pub near_clip_factor: f32,

    #[serde(rename = "farClipFactor")]
    pub far_clip_factor: f32,

    #[serde(rename = "nearClipPlane")]
    pub near_clip_plane: f32,

    #[serde(rename = "farClipPlane")]
    pub far_clip_plane: f32,

    #[serde(rename = "focalPlane")]
    pub focal_plane: f32,

    #[serde(rename = "quiltPreset", default)]
    pub quilt_preset: QuiltPreset,

    #[serde(rename = "customQuilt", default)]
    pub custom_quilt: QuiltSettings,

    #[serde(rename = "targetDisplay", default)]
    pub target_display: u32,

    /// Serial of the targeted display
    #[serde(rename = "targetLKG", default, skip_serializing_if = "Option::is_none")]
    pub target_lkg: Option<String>,

    #[serde(rename = "emulatedDevice", default)]
    pub emulated_device: DeviceType,

    /// Vertical field of view in degrees
    #[serde(rename = "fieldOfView", default = "default_field_of_view")]
    pub field_of_view: f32,

    #[serde(rename = "manualCalibrationMode", default)]
    pub manual_calibration_mode: ManualCalibrationMode,

    /// Calibration JSON read in file mode
    #[serde(rename = "calibrationFile", default, skip_serializing_if = "Option::is_none")]
    pub calibration_file: Option<PathBuf>,

    /// Hand-entered calibration
    #[serde(rename = "manualCalibration", default, skip_serializing_if = "Option::is_none")]
    pub manual_calibration: Option<CalibrationRecord>,
}

fn default_field_of_view() -> f32 {
    DEFAULT_FIELD_OF_VIEW
}

impl Default for HologramCameraSettings {
    fn default() -> Self {
        Self::from(&HologramCamera::default())
    }
}

impl From<&HologramCamera> for HologramCameraSettings {
    fn from(camera: &HologramCamera) -> Self {
        let props = camera.properties();
        let volume = props.volume();
        let planes = props.camera();
        Self {
            transform_mode: props.transform_mode(),
            size: volume.size,
            size_mode: volume.size_mode,
            near_clip_factor: volume.near_clip_factor,
            far_clip_factor: volume.far_clip_factor,
            near_clip_plane: planes.near_clip_plane,
            far_clip_plane: planes.far_clip_plane,
            focal_plane: planes.focal_plane,
            quilt_preset: camera.quilt_preset(),
            custom_quilt: camera.custom_quilt(),
            target_display: camera.target_display(),
            target_lkg: camera.target_lkg().map(str::to_string),
            emulated_device: camera.emulated_device(),
            field_of_view: camera.field_of_view(),
            manual_calibration_mode: camera.manual_calibration_mode(),
            calibration_file: camera.calibration_file().map(Path::to_path_buf),
            manual_calibration: camera.manual_calibration().cloned(),
        }
    }
}

impl HologramCameraSettings {
    /// Build a camera; out-of-range values are clamped.
    ///
    /// A calibration file or manual calibration that cannot be used is
    /// logged and leaves the camera on the discovered displays.
    pub fn to_camera(&self) -> HologramCamera {
        let properties = HologramCameraProperties::from_parts(
            self.transform_mode,
            VolumeParams {
                size: self.size,
                size_mode: self.size_mode,
                near_clip_factor: self.near_clip_factor,
                far_clip_factor: self.far_clip_factor,
            },
            CameraParams {
                near_clip_plane: self.near_clip_plane,
                far_clip_plane: self.far_clip_plane,
                focal_plane: self.focal_plane,
            },
        );
        let mut camera = HologramCamera::from_stored(
            properties,
            self.quilt_preset,
            self.custom_quilt.sanitized(),
            self.target_display,
            self.target_lkg.clone(),
            self.emulated_device,
            self.field_of_view,
        );

        camera.set_manual_calibration_mode(self.manual_calibration_mode);
        if let Err(e) = camera.set_manual_calibration(self.manual_calibration.clone()) {
            tracing::warn!("Ignoring stored manual calibration: {}", e);
        }
        if let Err(e) = camera.set_calibration_file(self.calibration_file.clone()) {
            tracing::warn!(
                "Calibration file {} not loaded: {}",
                self.calibration_file
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                e
            );
        }
        camera
    }

    /// Parse from XML text
    pub fn from_xml(xml: &str) -> Result<Self, SettingsError> {
        from_str(xml).map_err(SettingsError::XmlParse)
    }

    /// Serialize to XML text, with declaration
    pub fn to_xml(&self) -> Result<String, SettingsError> {
        let xml = to_string(self).map_err(SettingsError::XmlWrite)?;
        Ok(format!("{}{}", XML_DECLARATION, xml))
    }

    /// Load from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        Self::from_xml(&contents)
    }

    /// Save to an XML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        write_xml(self, path)
    }
}

fn write_xml<T: Serialize>(value: &T, path: &Path) -> Result<(), SettingsError> {
    let xml = to_string(value).map_err(SettingsError::XmlWrite)?;
    let formatted = format!("{}{}", XML_DECLARATION, xml);
    fs::write(path, formatted).map_err(SettingsError::Io)?;
    Ok(())
}

/// Settings-related errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("XML parse error: {0}")]
    XmlParse(quick_xml::DeError),
    #[error("XML write error: {0}")]
    XmlWrite(quick_xml::SeError),
    #[error("Could not find config directory")]
    NoConfigDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.default_emulated_device, DeviceType::Portrait);
        assert_eq!(config.calibration_wait(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.resync_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_config_round_trip_and_defaults() {
        let config = HostConfig {
            default_emulated_device: DeviceType::Gen2ThirtyTwo,
            calibration_wait_ms: 250,
            poll_interval_frames: 3,
            target_fps: 30,
            resync_delay_frames: 12,
        };
        let xml = to_string(&config).unwrap();
        assert_eq!(from_str::<HostConfig>(&xml).unwrap(), config);

        let sparse: HostConfig =
            from_str("<HoloCameraConfig><targetFps>120</targetFps></HoloCameraConfig>").unwrap();
        assert_eq!(sparse.target_fps, 120);
        assert_eq!(sparse.resync_delay_frames, 6);
    }

    #[test]
    fn test_fps_clamping() {
        let mut config = HostConfig {
            target_fps: 0,
            ..Default::default()
        };
        config.clamp_fps();
        assert_eq!(config.target_fps, 1);
    }

    #[test]
    fn test_camera_settings_round_trip() {
        let settings = HologramCameraSettings {
            transform_mode: TransformMode::Camera,
            size: 2.5,
            size_mode: SizeMode::ScaleSetsSize,
            near_clip_factor: 0.125,
            far_clip_factor: 0.875,
            near_clip_plane: 0.3,
            far_clip_plane: 250.0,
            focal_plane: 12.75,
            quilt_preset: QuiltPreset::Custom,
            custom_quilt: QuiltSettings::new(4096, 2048, 8, 4),
            target_display: 2,
            target_lkg: Some("LKG-2K-01234".to_string()),
            emulated_device: DeviceType::Go,
            field_of_view: 20.0,
            manual_calibration_mode: ManualCalibrationMode::UseManualSettings,
            calibration_file: Some(PathBuf::from("missing/bench-calibration.json")),
            manual_calibration: Some(CalibrationRecord::new("BENCH", 3840, 2160, "16in")),
        };

        let xml = settings.to_xml().unwrap();
        assert!(xml.contains("<targetLKG>LKG-2K-01234</targetLKG>"));
        assert!(xml.contains("<manualCalibrationMode>UseManualSettings</manualCalibrationMode>"));
        assert!(xml.contains("<screenW>3840</screenW>"));
        let parsed = HologramCameraSettings::from_xml(&xml).unwrap();
        assert_eq!(parsed, settings);

        // Through a camera and back; the unreadable file keeps its path
        let camera = parsed.to_camera();
        assert_eq!(
            camera.calibration_override().map(|r| r.serial.as_str()),
            Some("BENCH")
        );
        assert_eq!(HologramCameraSettings::from(&camera), settings);
    }

    #[test]
    fn test_missing_target_is_omitted() {
        let settings = HologramCameraSettings::default();
        let xml = settings.to_xml().unwrap();
        assert!(!xml.contains("targetLKG"));
        assert!(!xml.contains("manualCalibration>"));
        assert!(!xml.contains("calibrationFile"));
        assert_eq!(HologramCameraSettings::from_xml(&xml).unwrap().target_lkg, None);
    }

    #[test]
    fn test_out_of_range_values_clamped_on_load() {
        let settings = HologramCameraSettings {
            near_clip_factor: 0.9,
            far_clip_factor: 0.1,
            near_clip_plane: -1.0,
            ..Default::default()
        };
        let camera = settings.to_camera();
        let props = camera.properties();
        assert!(props.volume().near_clip_factor < props.volume().far_clip_factor);
        assert!(props.camera().near_clip_plane > 0.0);
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("holo-camera-settings-{}.xml", std::process::id()));
        let settings = HologramCameraSettings::default();
        settings.save_to_file(&path).unwrap();
        assert_eq!(HologramCameraSettings::load_from_file(&path).unwrap(), settings);
        let _ = fs::remove_file(&path);
    }
}
