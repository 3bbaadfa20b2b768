// SPDX-License-Identifier: GPL-3.0-only

//! Scriptable camera for controller and server tests

#![allow(dead_code)]

use bytes::Bytes;
use camera_server::backends::camera::{
    BackendError, BackendResult, CameraBackendType, CameraHardware, CaptureProfile, FrameOutput,
    JpegFrame, Resolution,
};
use camera_server::camera::{CameraController, ControllerSettings};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Hardware operations recorded by [`MockCamera`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Configure,
    Start,
    Stop,
    Capture,
    StartRecording,
    StopRecording,
}

/// Test side of a [`MockCamera`], usable after the camera moved into a controller
#[derive(Default)]
pub struct MockHandle {
    calls: Mutex<Vec<Op>>,
    failing: Mutex<HashSet<Op>>,
    output: Mutex<Option<Arc<dyn FrameOutput>>>,
    last_profile: Mutex<Option<CaptureProfile>>,
    capture_delay: Mutex<Duration>,
    captures: AtomicUsize,
    sequence: AtomicU64,
}

impl MockHandle {
    /// Make every later call of `op` fail
    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn succeed(&self, op: Op) {
        self.failing.lock().unwrap().remove(&op);
    }

    pub fn set_capture_delay(&self, delay: Duration) {
        *self.capture_delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<Op> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Successful still captures so far
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn is_recording(&self) -> bool {
        self.output.lock().unwrap().is_some()
    }

    pub fn last_profile(&self) -> Option<CaptureProfile> {
        *self.last_profile.lock().unwrap()
    }

    /// Push one frame if recording; returns its sequence number
    pub fn emit_frame(&self) -> Option<u64> {
        let output = self.output.lock().unwrap().clone()?;
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        output.write_frame(JpegFrame::new(
            format!("\u{FF}frame-{}", sequence).into_bytes(),
            sequence,
        ));
        Some(sequence)
    }

    fn record(&self, op: Op) -> BackendResult<()> {
        self.calls.lock().unwrap().push(op);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(BackendError::Other(format!("scripted {:?} failure", op)));
        }
        Ok(())
    }
}

pub struct MockCamera {
    handle: Arc<MockHandle>,
}

impl MockCamera {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (
            Self {
                handle: Arc::clone(&handle),
            },
            handle,
        )
    }
}

impl CameraHardware for MockCamera {
    fn configure(&mut self, profile: CaptureProfile) -> BackendResult<()> {
        self.handle.record(Op::Configure)?;
        *self.handle.last_profile.lock().unwrap() = Some(profile);
        Ok(())
    }

    fn start(&mut self) -> BackendResult<()> {
        self.handle.record(Op::Start)
    }

    fn stop(&mut self) -> BackendResult<()> {
        self.handle.record(Op::Stop)
    }

    fn capture_jpeg(&mut self) -> BackendResult<Bytes> {
        self.handle.record(Op::Capture)?;
        let delay = *self.handle.capture_delay.lock().unwrap();
        std::thread::sleep(delay);
        let n = self.handle.captures.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Bytes::from(format!("\u{FF}still-{}", n)))
    }

    fn start_recording(&mut self, output: Arc<dyn FrameOutput>) -> BackendResult<()> {
        self.handle.record(Op::StartRecording)?;
        *self.handle.output.lock().unwrap() = Some(output);
        Ok(())
    }

    fn stop_recording(&mut self) -> BackendResult<()> {
        self.handle.record(Op::StopRecording)?;
        *self.handle.output.lock().unwrap() = None;
        Ok(())
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::TestPattern
    }
}

pub fn test_settings() -> ControllerSettings {
    ControllerSettings {
        still_resolution: Resolution::new(640, 480),
        video_resolution: Resolution::new(320, 240),
        settle_delay: Duration::ZERO,
    }
}

/// Controller over a fresh mock camera
pub fn mock_controller() -> (Arc<CameraController>, Arc<MockHandle>) {
    let (camera, handle) = MockCamera::new();
    let controller = Arc::new(CameraController::new(Box::new(camera), test_settings()));
    (controller, handle)
}
