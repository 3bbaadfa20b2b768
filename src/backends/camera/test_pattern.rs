// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Encodes moving color bars with the `image` crate. Useful on machines
//! without a camera and for exercising the streaming path end to end.

use super::frame_loop::{CaptureLoop, LoopAction};
use super::types::*;
use super::CameraHardware;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Color bars, left to right
const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// Bar width in pixels
const BAR_WIDTH: u64 = 32;

/// Pixels the pattern moves per frame
const SCROLL_STEP: u64 = 4;

/// Software camera producing JPEG test patterns
pub struct TestPatternCamera {
    profile: Option<CaptureProfile>,
    started: bool,
    recording: Option<CaptureLoop>,
    framerate: u32,
    jpeg_quality: u8,
    stills_captured: u64,
}

impl TestPatternCamera {
    pub fn new(framerate: u32, jpeg_quality: u8) -> Self {
        info!(framerate, jpeg_quality, "Creating test pattern camera");
        Self {
            profile: None,
            started: false,
            recording: None,
            framerate: framerate.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
            stills_captured: 0,
        }
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.framerate as f64)
    }
}

impl CameraHardware for TestPatternCamera {
    fn configure(&mut self, profile: CaptureProfile) -> BackendResult<()> {
        if self.started || self.recording.is_some() {
            return Err(BackendError::Other(
                "camera must be stopped before it is reconfigured".into(),
            ));
        }
        debug!(%profile, "Configuring test pattern camera");
        self.profile = Some(profile);
        Ok(())
    }

    fn start(&mut self) -> BackendResult<()> {
        if self.profile.is_none() {
            return Err(BackendError::NotConfigured);
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        self.started = false;
        Ok(())
    }

    fn capture_jpeg(&mut self) -> BackendResult<Bytes> {
        if !self.started {
            return Err(BackendError::NotStarted);
        }
        let profile = self.profile.ok_or(BackendError::NotConfigured)?;

        self.stills_captured += 1;
        let jpeg = render_pattern(profile.resolution(), self.stills_captured, self.jpeg_quality)?;
        Ok(Bytes::from(jpeg))
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

        let resolution = profile.resolution();
        let quality = self.jpeg_quality;
        let interval = self.frame_interval();
        let mut sequence = 0u64;

        let recording = CaptureLoop::start("test-pattern-recording", move || {
            let frame_start = Instant::now();
            sequence += 1;

            match render_pattern(resolution, sequence, quality) {
                Ok(jpeg) => output.write_frame(JpegFrame::new(jpeg, sequence)),
                Err(e) => {
                    warn!(error = %e, "Failed to encode test pattern frame");
                    return LoopAction::Stop;
                }
            }

            if let Some(remaining) = interval.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(remaining);
            }
            LoopAction::Continue
        });

        self.recording = Some(recording);
        self.started = true;
        Ok(())
    }

    fn stop_recording(&mut self) -> BackendResult<()> {
        if let Some(mut recording) = self.recording.take() {
            recording.stop();
        }
        self.started = false;
        Ok(())
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::TestPattern
    }
}

/// Encode one frame of scrolling color bars
pub fn render_pattern(resolution: Resolution, phase: u64, quality: u8) -> BackendResult<Vec<u8>> {
    let offset = phase.wrapping_mul(SCROLL_STEP);
    let height = resolution.height.max(1) as u64;

    let img = RgbImage::from_fn(resolution.width, resolution.height, |x, y| {
        let bar = ((x as u64).wrapping_add(offset) / BAR_WIDTH % BARS.len() as u64) as usize;
        // Darken towards the bottom so orientation is visible
        let shade = 255 - (y as u64 * 96 / height) as u16;
        let [r, g, b] = BARS[bar];
        Rgb([
            (r as u16 * shade / 255) as u8,
            (g as u16 * shade / 255) as u8,
            (b as u16 * shade / 255) as u8,
        ])
    });

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(&img)
        .map_err(|e| BackendError::CaptureFailed(e.to_string()))?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Collect(Mutex<Vec<JpegFrame>>);

    impl FrameOutput for Collect {
        fn write_frame(&self, frame: JpegFrame) {
            self.0.lock().unwrap().push(frame);
        }
    }

    #[test]
    fn test_render_pattern_is_jpeg() {
        let jpeg = render_pattern(Resolution::new(64, 48), 3, 80).unwrap();
        // SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_capture_requires_start() {
        let mut camera = TestPatternCamera::new(30, 80);
        camera
            .configure(CaptureProfile::Still(Resolution::new(32, 32)))
            .unwrap();
        assert!(matches!(
            camera.capture_jpeg(),
            Err(BackendError::NotStarted)
        ));
        camera.start().unwrap();
        assert!(!camera.capture_jpeg().unwrap().is_empty());
    }

    #[test]
    fn test_recording_rejects_still_profile() {
        let mut camera = TestPatternCamera::new(30, 80);
        camera
            .configure(CaptureProfile::Still(Resolution::new(32, 32)))
            .unwrap();
        let output = Arc::new(Collect(Mutex::new(Vec::new())));
        assert!(camera.start_recording(output).is_err());
    }

    #[test]
    fn test_recording_produces_increasing_frames() {
        let mut camera = TestPatternCamera::new(200, 60);
        camera
            .configure(CaptureProfile::Video(Resolution::new(32, 32)))
            .unwrap();
        let output = Arc::new(Collect(Mutex::new(Vec::new())));
        camera.start_recording(output.clone()).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        camera.stop_recording().unwrap();

        let frames = output.0.lock().unwrap();
        assert!(!frames.is_empty());
        assert!(frames.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }
}
