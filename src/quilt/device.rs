//! Device families and their quilt layouts
//!
//! Every supported display family has a native screen resolution, the
//! device type name its calibration reports, and a default quilt layout.

use serde::{Deserialize, Serialize};

/// Render-target description for a quilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuiltSettings {
    /// Quilt texture width in pixels
    pub width: u32,
    /// Quilt texture height in pixels
    pub height: u32,
    /// Views per row
    pub columns: u32,
    /// Rows of views
    pub rows: u32,
}

impl QuiltSettings {
    pub const fn new(width: u32, height: u32, columns: u32, rows: u32) -> Self {
        Self {
            width,
            height,
            columns,
            rows,
        }
    }

    /// Number of views in the quilt
    pub fn view_count(&self) -> u32 {
        self.columns.saturating_mul(self.rows)
    }

    /// Size of a single view tile
    pub fn tile_size(&self) -> (u32, u32) {
        (
            self.width / self.columns.max(1),
            self.height / self.rows.max(1),
        )
    }

    /// Copy with every dimension at least 1
    pub fn sanitized(&self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
            columns: self.columns.max(1),
            rows: self.rows.max(1),
        }
    }
}

impl Default for QuiltSettings {
    fn default() -> Self {
        DeviceType::default().profile().quilt
    }
}

/// Known display families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeviceType {
    #[default]
    Portrait,
    Go,
    Gen2Sixteen,
    Gen2ThirtyTwo,
    Gen2SixtyFive,
    SixteenSpatial,
    ThirtyTwoSpatial,
}

/// Static description of a device family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub device_type: DeviceType,
    /// Name reported in calibration records
    pub type_name: &'static str,
    /// Native screen width in pixels
    pub screen_width: u32,
    /// Native screen height in pixels
    pub screen_height: u32,
    /// Default quilt layout
    pub quilt: QuiltSettings,
}

impl DeviceProfile {
    /// Screen aspect ratio (width / height)
    pub fn aspect(&self) -> f32 {
        self.screen_width as f32 / self.screen_height.max(1) as f32
    }

    pub fn view_count(&self) -> u32 {
        self.quilt.view_count()
    }
}

const PROFILES: [DeviceProfile; 7] = [
    DeviceProfile {
        device_type: DeviceType::Portrait,
        type_name: "Portrait",
        screen_width: 1536,
        screen_height: 2048,
        quilt: QuiltSettings::new(3360, 3360, 8, 6),
    },
    DeviceProfile {
        device_type: DeviceType::Go,
        type_name: "Go",
        screen_width: 1440,
        screen_height: 2560,
        quilt: QuiltSettings::new(4092, 4092, 11, 6),
    },
    DeviceProfile {
        device_type: DeviceType::Gen2Sixteen,
        type_name: "16in",
        screen_width: 3840,
        screen_height: 2160,
        quilt: QuiltSettings::new(4096, 4096, 5, 9),
    },
    DeviceProfile {
        device_type: DeviceType::Gen2ThirtyTwo,
        type_name: "32in",
        screen_width: 7680,
        screen_height: 4320,
        quilt: QuiltSettings::new(8192, 8192, 5, 9),
    },
    DeviceProfile {
        device_type: DeviceType::Gen2SixtyFive,
        type_name: "65in",
        screen_width: 7680,
        screen_height: 4320,
        quilt: QuiltSettings::new(8192, 8192, 8, 9),
    },
    DeviceProfile {
        device_type: DeviceType::SixteenSpatial,
        type_name: "16in Spatial",
        screen_width: 3840,
        screen_height: 2160,
        quilt: QuiltSettings::new(5999, 5999, 7, 7),
    },
    DeviceProfile {
        device_type: DeviceType::ThirtyTwoSpatial,
        type_name: "32in Spatial",
        screen_width: 7680,
        screen_height: 4320,
        quilt: QuiltSettings::new(8190, 8190, 7, 7),
    },
];

impl DeviceType {
    /// Every device family
    pub const ALL: [DeviceType; 7] = [
        DeviceType::Portrait,
        DeviceType::Go,
        DeviceType::Gen2Sixteen,
        DeviceType::Gen2ThirtyTwo,
        DeviceType::Gen2SixtyFive,
        DeviceType::SixteenSpatial,
        DeviceType::ThirtyTwoSpatial,
    ];

    /// Static profile of this family
    pub fn profile(&self) -> &'static DeviceProfile {
        let index = match self {
            DeviceType::Portrait => 0,
            DeviceType::Go => 1,
            DeviceType::Gen2Sixteen => 2,
            DeviceType::Gen2ThirtyTwo => 3,
            DeviceType::Gen2SixtyFive => 4,
            DeviceType::SixteenSpatial => 5,
            DeviceType::ThirtyTwoSpatial => 6,
        };
        &PROFILES[index]
    }

    /// Look up a family by the name a calibration reports (case-insensitive)
    pub fn from_type_name(name: &str) -> Option<Self> {
        let name = name.trim();
        PROFILES
            .iter()
            .find(|p| p.type_name.eq_ignore_ascii_case(name))
            .map(|p| p.device_type)
    }

    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            DeviceType::Portrait => "Looking Glass Portrait",
            DeviceType::Go => "Looking Glass Go",
            DeviceType::Gen2Sixteen => "Looking Glass 16\"",
            DeviceType::Gen2ThirtyTwo => "Looking Glass 32\"",
            DeviceType::Gen2SixtyFive => "Looking Glass 65\"",
            DeviceType::SixteenSpatial => "Looking Glass 16\" Spatial",
            DeviceType::ThirtyTwoSpatial => "Looking Glass 32\" Spatial",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_match_types() {
        for device in DeviceType::ALL {
            assert_eq!(device.profile().device_type, device);
            assert_eq!(DeviceType::from_type_name(device.profile().type_name), Some(device));
        }
    }

    #[test]
    fn test_type_name_lookup() {
        assert_eq!(DeviceType::from_type_name("portrait"), Some(DeviceType::Portrait));
        assert_eq!(DeviceType::from_type_name(" 16IN "), Some(DeviceType::Gen2Sixteen));
        assert_eq!(DeviceType::from_type_name("Prototype"), None);
    }

    #[test]
    fn test_view_counts() {
        assert_eq!(DeviceType::Portrait.profile().view_count(), 48);
        assert_eq!(DeviceType::Gen2SixtyFive.profile().view_count(), 72);
        assert_eq!(QuiltSettings::new(100, 100, 0, 4).sanitized().view_count(), 4);
    }

    #[test]
    fn test_quilt_settings_serde_names() {
        let json = serde_json::to_string(&QuiltSettings::new(4096, 4096, 5, 9)).unwrap();
        assert_eq!(json, r#"{"width":4096,"height":4096,"columns":5,"rows":9}"#);
    }
}
