//! Display calibration records
//!
//! A calibration record is the per-device data this crate needs from the
//! hardware discovery layer: which unit it is, its native resolution and its
//! device family.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Calibration data of one physical display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Unique serial of the unit
    pub serial: String,

    /// Native screen width in pixels
    #[serde(rename = "screenW", alias = "screenWidth")]
    pub screen_width: u32,

    /// Native screen height in pixels
    #[serde(rename = "screenH", alias = "screenHeight")]
    pub screen_height: u32,

    /// Device family name, e.g. "Portrait"
    #[serde(rename = "deviceType", alias = "deviceTypeName", default)]
    pub device_type_name: String,
}

impl CalibrationRecord {
    /// Create a record from its parts
    pub fn new(
        serial: impl Into<String>,
        screen_width: u32,
        screen_height: u32,
        device_type_name: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            screen_width,
            screen_height,
            device_type_name: device_type_name.into(),
        }
    }

    /// Native resolution as (width, height)
    pub fn resolution(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    /// Screen aspect ratio (width / height)
    pub fn aspect(&self) -> f32 {
        self.screen_width as f32 / self.screen_height.max(1) as f32
    }

    /// Check the invariants every record must satisfy
    pub fn validate(&self) -> Result<(), CalibrationLoadError> {
        if self.serial.trim().is_empty() {
            return Err(CalibrationLoadError::Invalid("empty serial".to_string()));
        }
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(CalibrationLoadError::Invalid(format!(
                "{}: screen resolution must be non-zero, got {}x{}",
                self.serial, self.screen_width, self.screen_height
            )));
        }
        Ok(())
    }

    /// Parse and validate a record from JSON
    pub fn from_json_str(json: &str) -> Result<Self, CalibrationLoadError> {
        let record: Self = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    /// Load a record from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, CalibrationLoadError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Pretty JSON, as shown in calibration data readouts
    pub fn to_json_pretty(&self) -> Result<String, CalibrationLoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for CalibrationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} {}x{})",
            self.serial, self.device_type_name, self.screen_width, self.screen_height
        )
    }
}

/// Errors while reading calibration data
#[derive(Debug, thiserror::Error)]
pub enum CalibrationLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid calibration: {0}")]
    Invalid(String),
}
