// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use crate::backends::camera::Resolution;

/// Default still capture size (1080p)
pub const DEFAULT_STILL_RESOLUTION: Resolution = Resolution::new(1920, 1080);

/// Default video stream size (480p, 16:9)
pub const DEFAULT_VIDEO_RESOLUTION: Resolution = Resolution::new(854, 480);

/// Network defaults
pub mod network {
    /// Port the server listens on
    pub const DEFAULT_PORT: u16 = 8088;

    /// Pending connection backlog of the listening socket
    pub const LISTEN_BACKLOG: u32 = 1024;
}

/// MJPEG stream constants
pub mod stream {
    use std::time::Duration;

    /// Multipart boundary between frames
    pub const MJPEG_BOUNDARY: &str = "FRAME";

    /// Shortest delay between frames sent to one client (about 60 fps)
    pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(16);

    /// Delay between frames when the client does not ask for a rate (4 fps)
    pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(250);
}

/// Still image constants
pub mod still {
    use std::time::Duration;

    /// Cached still reused for this long unless the client asks otherwise
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60);

    /// Smallest staleness a client may request
    pub const MIN_MAX_AGE: Duration = Duration::from_secs(1);

    /// Reported age of a still that was never captured
    pub const NEVER_CAPTURED: Duration = Duration::from_millis(9_999_900);
}

/// Timing constants
pub mod timing {
    use std::time::Duration;

    /// Pause after starting the sensor for still capture, letting auto
    /// exposure and white balance converge
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 300;
}

/// Camera defaults
pub mod camera {
    /// V4L2 device used when none is configured
    pub const DEFAULT_DEVICE_PATH: &str = "/dev/video0";

    /// Requested recording frame rate
    pub const DEFAULT_VIDEO_FRAMERATE: u32 = 30;

    /// Quality of software-encoded JPEGs
    pub const DEFAULT_JPEG_QUALITY: u8 = 85;

    /// Thermal zone read by `/temp`
    pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
