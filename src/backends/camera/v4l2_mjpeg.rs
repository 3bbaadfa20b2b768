// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture for cameras that encode MJPEG in hardware
//!
//! The device delivers complete JPEG images per buffer, so both still
//! capture and the live stream pass the driver's bytes through untouched.

use super::frame_loop::{CaptureLoop, LoopAction};
use super::types::*;
use super::CameraHardware;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::video::capture::Parameters;
use v4l::FourCC;

/// Number of memory-mapped buffers queued with the driver
const STREAM_BUFFERS: u32 = 4;

/// Consecutive dequeue failures after which recording gives up
const MAX_CONSECUTIVE_ERRORS: u32 = 30;

fn mjpg_fourcc() -> FourCC {
    FourCC::new(b"MJPG")
}

/// MJPEG V4L2 camera
pub struct V4l2MjpegCamera {
    device_path: String,
    framerate: u32,
    /// None while the recording thread owns the device
    device: Option<Device>,
    profile: Option<CaptureProfile>,
    still_stream: Option<MmapStream<'static>>,
    recording: Option<CaptureLoop>,
}

impl V4l2MjpegCamera {
    /// Open the device node and log what it is
    pub fn open(device_path: &str, framerate: u32) -> BackendResult<Self> {
        let device = open_device(device_path)?;

        match device.query_caps() {
            Ok(caps) => info!(
                device_path,
                card = %caps.card,
                driver = %caps.driver,
                "Opened V4L2 camera"
            ),
            Err(e) => warn!(device_path, error = %e, "Could not query V4L2 capabilities"),
        }

        Ok(Self {
            device_path: device_path.to_string(),
            framerate: framerate.max(1),
            device: Some(device),
            profile: None,
            still_stream: None,
            recording: None,
        })
    }

    fn device(&mut self) -> BackendResult<&Device> {
        if self.device.is_none() {
            self.device = Some(open_device(&self.device_path)?);
        }
        self.device.as_ref().ok_or(BackendError::NotConfigured)
    }
}

impl CameraHardware for V4l2MjpegCamera {
    fn configure(&mut self, profile: CaptureProfile) -> BackendResult<()> {
        if self.still_stream.is_some() || self.recording.is_some() {
            return Err(BackendError::Other(
                "camera must be stopped before it is reconfigured".into(),
            ));
        }

        let framerate = self.framerate;
        let device = self.device()?;
        apply_format(device, profile.resolution())?;

        if profile.is_video() {
            if let Err(e) = device.set_params(&Parameters::with_fps(framerate)) {
                warn!(framerate, error = %e, "Device rejected frame rate, using its default");
            }
        }

        debug!(%profile, "Configured V4L2 camera");
        self.profile = Some(profile);
        Ok(())
    }

    fn start(&mut self) -> BackendResult<()> {
        if self.profile.is_none() {
            return Err(BackendError::NotConfigured);
        }
        if self.still_stream.is_some() {
            return Ok(());
        }

        let device = self.device()?;
        let mut stream = MmapStream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| BackendError::StartFailed(format!("failed to create buffer stream: {}", e)))?;

        // The first dequeue queues all buffers and turns streaming on, so the
        // sensor runs (and its exposure converges) from here on.
        stream
            .next()
            .map_err(|e| BackendError::StartFailed(format!("no frame from device: {}", e)))?;

        self.still_stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        if self.still_stream.take().is_some() {
            debug!("Stopped V4L2 still stream");
        }
        Ok(())
    }

    fn capture_jpeg(&mut self) -> BackendResult<Bytes> {
        let stream = self.still_stream.as_mut().ok_or(BackendError::NotStarted)?;

        // Buffers filled while the sensor settled are stale; cycle through
        // all of them and keep the newest.
        let mut jpeg = Bytes::new();
        for _ in 0..STREAM_BUFFERS {
            let (buf, meta) = stream
                .next()
                .map_err(|e| BackendError::CaptureFailed(e.to_string()))?;
            jpeg = Bytes::copy_from_slice(used_bytes(buf, meta.bytesused));
        }

        if jpeg.is_empty() {
            return Err(BackendError::CaptureFailed("device returned an empty buffer".into()));
        }
        Ok(jpeg)
    }

    fn start_recording(&mut self, output: Arc<dyn FrameOutput>) -> BackendResult<()> {
        let profile = self.profile.ok_or(BackendError::NotConfigured)?;
        if !profile.is_video() {
            return Err(BackendError::FormatNotSupported(
                "recording requires a video configuration".into(),
            ));
        }
        if self.recording.is_some() {
            return Err(BackendError::StartFailed("already recording".into()));
        }

        self.device()?;
        let device = self.device.take().ok_or(BackendError::NotConfigured)?;
        let mut sequence = 0u64;
        let mut consecutive_errors = 0u32;

        let recording = CaptureLoop::start_with_init(
            "v4l2-mjpeg-recording",
            move || {
                let stream = MmapStream::with_buffers(&device, Type::VideoCapture, STREAM_BUFFERS)
                    .map_err(|e| format!("failed to create buffer stream: {}", e))?;
                Ok((device, stream))
            },
            move |(_device, stream): &mut (Device, MmapStream<'static>)| match stream.next() {
                Ok((buf, meta)) => {
                    consecutive_errors = 0;
                    sequence += 1;
                    let data = Bytes::copy_from_slice(used_bytes(buf, meta.bytesused));
                    output.write_frame(JpegFrame::new(data, sequence));
                    LoopAction::Continue
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(error = %e, consecutive_errors, "Failed to dequeue MJPEG frame");
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return LoopAction::Stop;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                    LoopAction::Continue
                }
            },
        )
        .map_err(BackendError::StartFailed)?;

        self.recording = Some(recording);
        Ok(())
    }

    fn stop_recording(&mut self) -> BackendResult<()> {
        if let Some(mut recording) = self.recording.take() {
            recording.stop();
            debug!("Stopped V4L2 recording");
        }
        Ok(())
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}

fn open_device(device_path: &str) -> BackendResult<Device> {
    Device::with_path(device_path)
        .map_err(|e| BackendError::DeviceNotFound(format!("{}: {}", device_path, e)))
}

/// Request MJPEG at the given size
fn apply_format(device: &Device, resolution: Resolution) -> BackendResult<()> {
    let mut format = device
        .format()
        .map_err(|e| BackendError::FormatNotSupported(format!("failed to query format: {}", e)))?;
    format.width = resolution.width;
    format.height = resolution.height;
    format.fourcc = mjpg_fourcc();

    let applied = device
        .set_format(&format)
        .map_err(|e| BackendError::FormatNotSupported(e.to_string()))?;

    if applied.fourcc != mjpg_fourcc() {
        return Err(BackendError::FormatNotSupported(format!(
            "device does not produce MJPEG (got {:?})",
            applied.fourcc
        )));
    }
    if applied.width != resolution.width || applied.height != resolution.height {
        warn!(
            requested = %resolution,
            width = applied.width,
            height = applied.height,
            "Device picked a different resolution"
        );
    }
    Ok(())
}

/// The driver reports how much of the mapped buffer holds the JPEG
fn used_bytes(buf: &[u8], bytesused: u32) -> &[u8] {
    let used = (bytesused as usize).min(buf.len());
    if used == 0 { buf } else { &buf[..used] }
}
