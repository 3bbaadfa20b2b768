// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Camera backend type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CameraBackendType {
    /// V4L2 device producing MJPEG natively (USB webcams, Pi camera via the V4L2 shim)
    #[default]
    V4l2,
    /// Synthetic camera that encodes a moving test pattern
    TestPattern,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::TestPattern => write!(f, "test pattern"),
        }
    }
}

/// Sensor output size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Hardware configuration applied before starting the camera
///
/// Still capture and video recording use different sensor modes, so the
/// camera is always reconfigured when switching between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureProfile {
    /// One-shot high resolution capture
    Still(Resolution),
    /// Continuous MJPEG encoding
    Video(Resolution),
}

impl CaptureProfile {
    pub fn resolution(&self) -> Resolution {
        match self {
            CaptureProfile::Still(res) | CaptureProfile::Video(res) => *res,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, CaptureProfile::Video(_))
    }
}

impl std::fmt::Display for CaptureProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureProfile::Still(res) => write!(f, "still {}", res),
            CaptureProfile::Video(res) => write!(f, "video {}", res),
        }
    }
}

/// One encoded JPEG frame from the video stream
///
/// `data` is reference counted, so handing a frame to many stream clients
/// never copies the image.
#[derive(Debug, Clone)]
pub struct JpegFrame {
    /// Encoded JPEG bytes
    pub data: Bytes,
    /// Monotonically increasing per recording backend
    pub sequence: u64,
    /// When the frame left the encoder
    pub captured_at: Instant,
}

impl JpegFrame {
    pub fn new(data: impl Into<Bytes>, sequence: u64) -> Self {
        Self {
            data: data.into(),
            sequence,
            captured_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Destination of recorded frames
///
/// Backends call `write_frame` from their recording thread for every frame
/// the encoder produces.
pub trait FrameOutput: Send + Sync {
    fn write_frame(&self, frame: JpegFrame);
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found or could not be opened
    DeviceNotFound(String),
    /// Requested resolution or pixel format rejected by the device
    FormatNotSupported(String),
    /// Operation requires a configured camera
    NotConfigured,
    /// Operation requires a started camera
    NotStarted,
    /// Starting the sensor or the encoder failed
    StartFailed(String),
    /// Frame capture or encoding failed
    CaptureFailed(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::NotConfigured => write!(f, "Camera is not configured"),
            BackendError::NotStarted => write!(f, "Camera is not started"),
            BackendError::StartFailed(msg) => write!(f, "Start failed: {}", msg),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}
