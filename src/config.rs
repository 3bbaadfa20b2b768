// SPDX-License-Identifier: GPL-3.0-only

//! Server configuration
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```json
//! { "port": 8080, "backend": "test-pattern", "settle_delay_ms": 250 }
//! ```

use crate::backends::camera::{BackendOptions, CameraBackendType, Resolution};
use crate::camera::ControllerSettings;
use crate::constants::{self, network, timing};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_address: IpAddr,
    /// Port the HTTP server binds to
    pub port: u16,
    /// Camera backend to use
    pub backend: CameraBackendType,
    /// V4L2 device node (V4L2 backend only)
    pub device_path: String,
    /// Still capture size
    pub still_resolution: Resolution,
    /// Video stream size
    pub video_resolution: Resolution,
    /// Requested video frame rate
    pub video_framerate: u32,
    /// Pause between starting the sensor and taking a still
    pub settle_delay_ms: u64,
    /// JPEG quality of software-encoded frames
    pub jpeg_quality: u8,
    /// Sysfs file read by `/temp`
    pub thermal_zone_path: PathBuf,
    /// Heading of the index page
    pub page_title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: network::DEFAULT_PORT,
            backend: CameraBackendType::default(),
            device_path: constants::camera::DEFAULT_DEVICE_PATH.to_string(),
            still_resolution: constants::DEFAULT_STILL_RESOLUTION,
            video_resolution: constants::DEFAULT_VIDEO_RESOLUTION,
            video_framerate: constants::camera::DEFAULT_VIDEO_FRAMERATE,
            settle_delay_ms: timing::DEFAULT_SETTLE_DELAY.as_millis() as u64,
            jpeg_quality: constants::camera::DEFAULT_JPEG_QUALITY,
            thermal_zone_path: PathBuf::from(constants::camera::DEFAULT_THERMAL_ZONE),
            page_title: "Camera".to_string(),
        }
    }
}

impl Config {
    /// Load a JSON config file
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate a JSON config document
    pub fn from_json(text: &str) -> AppResult<Self> {
        let config: Config =
            serde_json::from_str(text).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the camera cannot work with
    pub fn validate(&self) -> AppResult<()> {
        for (name, res) in [
            ("still_resolution", self.still_resolution),
            ("video_resolution", self.video_resolution),
        ] {
            if res.width == 0 || res.height == 0 {
                return Err(AppError::Config(format!("{} must be non-zero, got {}", name, res)));
            }
        }
        if self.video_framerate == 0 {
            return Err(AppError::Config("video_framerate must be at least 1".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(AppError::Config(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            still_resolution: self.still_resolution,
            video_resolution: self.video_resolution,
            settle_delay: self.settle_delay(),
        }
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            device_path: self.device_path.clone(),
            video_framerate: self.video_framerate,
            jpeg_quality: self.jpeg_quality,
        }
    }
}
