//! Quilt preset resolution
//!
//! Maps a requested preset plus the attached display's calibration to the
//! render-target dimensions and view count. Named device presets only apply
//! while no display is attached; once one is, the attached device wins.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::device::{DeviceType, QuiltSettings};
use crate::calibration::{CalibrationRecord, CalibrationRegistry};

/// Requested quilt preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QuiltPreset {
    /// Follow the attached display, or the emulated device without one
    #[default]
    Automatic,
    /// Use the custom quilt settings verbatim
    Custom,
    Portrait,
    Go,
    Gen2Sixteen,
    Gen2ThirtyTwo,
    Gen2SixtyFive,
    SixteenSpatial,
    ThirtyTwoSpatial,
}

impl QuiltPreset {
    /// Every preset, in menu order
    pub const ALL: [QuiltPreset; 9] = [
        QuiltPreset::Automatic,
        QuiltPreset::Custom,
        QuiltPreset::Portrait,
        QuiltPreset::Go,
        QuiltPreset::Gen2Sixteen,
        QuiltPreset::Gen2ThirtyTwo,
        QuiltPreset::Gen2SixtyFive,
        QuiltPreset::SixteenSpatial,
        QuiltPreset::ThirtyTwoSpatial,
    ];

    /// Device a named preset stands for
    pub fn device(&self) -> Option<DeviceType> {
        match self {
            QuiltPreset::Automatic | QuiltPreset::Custom => None,
            QuiltPreset::Portrait => Some(DeviceType::Portrait),
            QuiltPreset::Go => Some(DeviceType::Go),
            QuiltPreset::Gen2Sixteen => Some(DeviceType::Gen2Sixteen),
            QuiltPreset::Gen2ThirtyTwo => Some(DeviceType::Gen2ThirtyTwo),
            QuiltPreset::Gen2SixtyFive => Some(DeviceType::Gen2SixtyFive),
            QuiltPreset::SixteenSpatial => Some(DeviceType::SixteenSpatial),
            QuiltPreset::ThirtyTwoSpatial => Some(DeviceType::ThirtyTwoSpatial),
        }
    }

    /// Named preset for a device
    pub fn for_device(device: DeviceType) -> Self {
        match device {
            DeviceType::Portrait => QuiltPreset::Portrait,
            DeviceType::Go => QuiltPreset::Go,
            DeviceType::Gen2Sixteen => QuiltPreset::Gen2Sixteen,
            DeviceType::Gen2ThirtyTwo => QuiltPreset::Gen2ThirtyTwo,
            DeviceType::Gen2SixtyFive => QuiltPreset::Gen2SixtyFive,
            DeviceType::SixteenSpatial => QuiltPreset::SixteenSpatial,
            DeviceType::ThirtyTwoSpatial => QuiltPreset::ThirtyTwoSpatial,
        }
    }

    /// Preset selected by the "use custom render settings" toggle
    pub fn from_custom_toggle(use_custom: bool) -> Self {
        if use_custom {
            QuiltPreset::Custom
        } else {
            QuiltPreset::Automatic
        }
    }

    pub fn is_custom(&self) -> bool {
        *self == QuiltPreset::Custom
    }
}

/// Everything the resolver needs from a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuiltRequest {
    pub preset: QuiltPreset,
    /// Used when the preset is [`QuiltPreset::Custom`]
    pub custom: QuiltSettings,
    /// Device emulated while no display is attached
    pub emulated_device: DeviceType,
}

impl Default for QuiltRequest {
    fn default() -> Self {
        Self {
            preset: QuiltPreset::Automatic,
            custom: QuiltSettings::default(),
            emulated_device: DeviceType::default(),
        }
    }
}

/// Where a resolution came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum QuiltSource {
    /// User-supplied custom settings
    Custom,
    /// The attached display with this serial
    Calibration { serial: String },
    /// An emulated device
    Emulated { device: DeviceType },
}

/// Concrete render-target description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuiltResolution {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Number of views
    pub view_count: u32,
    /// Quilt layout to render into
    pub quilt: QuiltSettings,
    pub source: QuiltSource,
    /// A named or emulated selection was overridden by the attached display
    pub preset_superseded: bool,
}

#[derive(Default)]
struct ResolutionCache {
    revision: u64,
    /// Latest request and its resolution, per serial
    entries: HashMap<String, (QuiltRequest, QuiltResolution)>,
}

/// Resolves quilt presets, caching per-serial results until the registry changes
pub struct QuiltPresetResolver {
    /// Emulated device used when a request does not pick one
    default_emulated: DeviceType,
    cache: Mutex<ResolutionCache>,
}

impl Default for QuiltPresetResolver {
    fn default() -> Self {
        Self::new(DeviceType::default())
    }
}

impl QuiltPresetResolver {
    pub fn new(default_emulated: DeviceType) -> Self {
        Self {
            default_emulated,
            cache: Mutex::new(ResolutionCache::default()),
        }
    }

    /// Configured default emulated device
    pub fn default_emulated(&self) -> DeviceType {
        self.default_emulated
    }

    /// Request for `preset` using the configured default emulated device
    pub fn request(&self, preset: QuiltPreset, custom: QuiltSettings) -> QuiltRequest {
        QuiltRequest {
            preset,
            custom,
            emulated_device: self.default_emulated,
        }
    }

    /// Resolve `request` against the target display's calibration, if any.
    pub fn resolve(
        &self,
        request: &QuiltRequest,
        calibration: Option<&CalibrationRecord>,
    ) -> QuiltResolution {
        if request.preset == QuiltPreset::Custom {
            let quilt = request.custom.sanitized();
            return QuiltResolution {
                width: quilt.width,
                height: quilt.height,
                view_count: quilt.view_count(),
                quilt,
                source: QuiltSource::Custom,
                preset_superseded: false,
            };
        }

        match calibration {
            Some(calibration) => {
                let device = DeviceType::from_type_name(&calibration.device_type_name)
                    .unwrap_or(self.default_emulated);
                let quilt = device.profile().quilt;
                QuiltResolution {
                    width: calibration.screen_width,
                    height: calibration.screen_height,
                    view_count: quilt.view_count(),
                    quilt,
                    source: QuiltSource::Calibration {
                        serial: calibration.serial.clone(),
                    },
                    preset_superseded: request.preset != QuiltPreset::Automatic,
                }
            }
            None => {
                let device = request.preset.device().unwrap_or(request.emulated_device);
                let profile = device.profile();
                QuiltResolution {
                    width: profile.screen_width,
                    height: profile.screen_height,
                    view_count: profile.view_count(),
                    quilt: profile.quilt,
                    source: QuiltSource::Emulated { device },
                    preset_superseded: false,
                }
            }
        }
    }

    /// Resolve `request` for the display with `serial`, reusing the last
    /// result for that serial until the request or the registry revision
    /// changes.
    ///
    /// An unknown serial resolves as if no display were attached.
    pub fn resolve_cached(
        &self,
        registry: &CalibrationRegistry,
        serial: &str,
        request: &QuiltRequest,
    ) -> QuiltResolution {
        let snapshot = registry.snapshot();
        let mut cache = self.cache.lock();
        if cache.revision != snapshot.revision {
            tracing::debug!(
                stale = cache.entries.len(),
                revision = snapshot.revision,
                "QuiltPresetResolver: calibrations changed, dropping cached resolutions"
            );
            cache.entries.clear();
            cache.revision = snapshot.revision;
        }
        if let Some((cached_request, hit)) = cache.entries.get(serial) {
            if cached_request == request {
                return hit.clone();
            }
        }

        let calibration = snapshot.records.iter().find(|r| r.serial == serial);
        let resolution = self.resolve(request, calibration);
        cache
            .entries
            .insert(serial.to_string(), (*request, resolution.clone()));
        resolution
    }

    /// Number of cached resolutions
    pub fn cached_len(&self) -> usize {
        self.cache.lock().entries.len()
    }

    /// Whether named presets and the emulated device are meaningful choices.
    ///
    /// Once a display is attached they are superseded and should be hidden.
    pub fn emulated_selection_visible(calibration_count: usize) -> bool {
        calibration_count == 0
    }
}
