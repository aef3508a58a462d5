use std::time::Duration;

use crate::logging::LogSettings;
use crate::map::LatLng;

/// Fixed starting view of the map: continental US centroid.
pub const DEFAULT_CENTER: LatLng = LatLng { lat: 37.0902, lng: -95.7129 };
pub const DEFAULT_ZOOM: u8 = 4;

#[derive(Clone, Debug)]
pub struct Config {
    pub gateway_base: String,
    /// `None` means requests may wait indefinitely.
    pub request_timeout_ms: Option<u64>,
    pub map_center: LatLng,
    pub map_zoom: u8,
    pub log: LogSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_base: "http://127.0.0.1:5000".to_string(),
            request_timeout_ms: None,
            map_center: DEFAULT_CENTER,
            map_zoom: DEFAULT_ZOOM,
            log: LogSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gateway_base: std::env::var("GATEWAY_BASE").unwrap_or(defaults.gateway_base),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0),
            log: LogSettings::from_env(),
            ..defaults
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
