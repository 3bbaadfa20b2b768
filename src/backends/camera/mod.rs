// SPDX-License-Identifier: GPL-3.0-only

//! Camera hardware abstraction
//!
//! The camera controller never talks to a device directly. It drives a
//! [`CameraHardware`] implementation through a small, mode-oriented
//! interface:
//!
//! ```text
//! ┌─────────────────────┐
//! │  CameraController   │  ← mode state machine, one session at a time
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraHardware trait│  ← configure / start / capture / record
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴────────┐
//!      ▼              ▼
//!  ┌────────┐   ┌────────────┐
//!  │  V4L2  │   │Test pattern│
//!  └────────┘   └────────────┘
//! ```

pub mod frame_loop;
pub mod test_pattern;
pub mod types;
pub mod v4l2_mjpeg;

pub use types::*;

use bytes::Bytes;
use std::sync::Arc;

/// Exclusive access to one camera
///
/// The camera is either stopped, started for still capture, or recording
/// video. Callers are expected to serialize access (the controller holds the
/// hardware behind its mutex), so methods take `&mut self`.
pub trait CameraHardware: Send {
    /// Apply a still or video configuration
    ///
    /// Must be called while the camera is stopped.
    fn configure(&mut self, profile: CaptureProfile) -> BackendResult<()>;

    /// Start the sensor with the current still configuration
    fn start(&mut self) -> BackendResult<()>;

    /// Stop a camera started with [`CameraHardware::start`]
    fn stop(&mut self) -> BackendResult<()>;

    /// Capture one JPEG image from the started camera
    fn capture_jpeg(&mut self) -> BackendResult<Bytes>;

    /// Start continuous MJPEG encoding with the current video configuration
    ///
    /// Every encoded frame is passed to `output` from a backend thread until
    /// [`CameraHardware::stop_recording`] is called.
    fn start_recording(&mut self, output: Arc<dyn FrameOutput>) -> BackendResult<()>;

    /// Stop recording and the camera
    fn stop_recording(&mut self) -> BackendResult<()>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;
}

/// Backend construction parameters taken from the configuration
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// V4L2 device node
    pub device_path: String,
    /// Target frame rate of video recording
    pub video_framerate: u32,
    /// JPEG quality used by backends that encode in software
    pub jpeg_quality: u8,
}

/// Create the backend of the requested type
pub fn get_backend(
    backend_type: CameraBackendType,
    options: &BackendOptions,
) -> BackendResult<Box<dyn CameraHardware>> {
    match backend_type {
        CameraBackendType::V4l2 => Ok(Box::new(v4l2_mjpeg::V4l2MjpegCamera::open(
            &options.device_path,
            options.video_framerate,
        )?)),
        CameraBackendType::TestPattern => Ok(Box::new(test_pattern::TestPatternCamera::new(
            options.video_framerate,
            options.jpeg_quality,
        ))),
    }
}
