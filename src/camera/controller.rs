// SPDX-License-Identifier: GPL-3.0-only

//! Camera mode state machine
//!
//! The controller is the only owner of the camera hardware. It multiplexes
//! two access patterns onto a device that can do one thing at a time:
//!
//! - still capture: configure for high resolution, settle, write one JPEG
//!   into the [`StillCache`]
//! - streaming: configure for video and publish every encoded frame into
//!   the [`FrameRelay`] for as long as at least one client is registered
//!
//! All state and every transition live behind one mutex. Public operations
//! lock it exactly once and call the private `transition` function, so
//! transitions are totally ordered and nobody observes a half-configured
//! camera.

use super::frame_relay::FrameRelay;
use super::still_cache::StillCache;
use crate::backends::camera::{CameraBackendType, CameraHardware, CaptureProfile, Resolution};
use crate::constants::{self, timing};
use crate::errors::{CameraError, CameraResult};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Operating mode of the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraMode {
    #[default]
    Idle,
    CapturingStill,
    Streaming,
}

impl std::fmt::Display for CameraMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraMode::Idle => write!(f, "idle"),
            CameraMode::CapturingStill => write!(f, "still capture"),
            CameraMode::Streaming => write!(f, "streaming"),
        }
    }
}

/// Hardware parameters of the two capture modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub still_resolution: Resolution,
    pub video_resolution: Resolution,
    /// Pause between starting the sensor and taking the still
    pub settle_delay: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            still_resolution: constants::DEFAULT_STILL_RESOLUTION,
            video_resolution: constants::DEFAULT_VIDEO_RESOLUTION,
            settle_delay: timing::DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    pub mode: CameraMode,
    pub stream_clients: usize,
}

struct ControllerState {
    mode: CameraMode,
    stream_clients: usize,
    hardware: Box<dyn CameraHardware>,
}

/// Single authority over the camera session
///
/// Every method blocks for as long as the hardware needs; from async code
/// call them through `tokio::task::spawn_blocking`.
pub struct CameraController {
    state: Mutex<ControllerState>,
    still_cache: StillCache,
    frame_relay: FrameRelay,
    settings: ControllerSettings,
}

impl CameraController {
    /// Take ownership of the camera; starts out idle
    pub fn new(hardware: Box<dyn CameraHardware>, settings: ControllerSettings) -> Self {
        info!(
            backend = %hardware.backend_type(),
            still = %settings.still_resolution,
            video = %settings.video_resolution,
            settle_ms = settings.settle_delay.as_millis() as u64,
            "Creating camera controller"
        );

        Self {
            state: Mutex::new(ControllerState {
                mode: CameraMode::Idle,
                stream_clients: 0,
                hardware,
            }),
            still_cache: StillCache::new(),
            frame_relay: FrameRelay::new(),
            settings,
        }
    }

    pub fn still_cache(&self) -> &StillCache {
        &self.still_cache
    }

    pub fn frame_relay(&self) -> &FrameRelay {
        &self.frame_relay
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn backend_type(&self) -> CameraBackendType {
        self.lock_state().hardware.backend_type()
    }

    pub fn mode(&self) -> CameraMode {
        self.lock_state().mode
    }

    pub fn stream_client_count(&self) -> usize {
        self.lock_state().stream_clients
    }

    pub fn status(&self) -> ControllerStatus {
        let state = self.lock_state();
        ControllerStatus {
            mode: state.mode,
            stream_clients: state.stream_clients,
        }
    }

    /// Switch the camera to `target`; no-op if already there
    pub fn set_mode(&self, target: CameraMode) -> CameraResult<()> {
        let mut state = self.lock_state();
        self.transition(&mut state, target)
    }

    /// Take a fresh still, then go back to streaming if anyone is watching
    ///
    /// Registered stream clients see a pause in frames while this runs, but
    /// keep their registration. If the capture fails the stream is still
    /// resumed before the error is returned.
    pub fn capture_still_and_resume(&self) -> CameraResult<()> {
        let mut state = self.lock_state();
        self.capture_and_resume(&mut state)
    }

    /// Capture and resume only if the cached still is older than `max_age`
    /// or there is none yet
    ///
    /// Staleness is checked again after acquiring the controller, so a burst
    /// of requests that all found the cache stale produces one capture.
    /// Returns whether a capture was taken.
    pub fn refresh_still_if_older_than(&self, max_age: Duration) -> CameraResult<bool> {
        let mut state = self.lock_state();
        if !self.still_cache.is_stale(max_age) {
            debug!("Still refreshed by a concurrent request");
            return Ok(false);
        }
        self.capture_and_resume(&mut state)?;
        Ok(true)
    }

    /// Register a stream client and make sure the camera is streaming
    ///
    /// Returns the new client count. On failure the claim is released again.
    pub fn add_stream_client(&self) -> CameraResult<usize> {
        let mut state = self.lock_state();
        state.stream_clients += 1;
        info!(clients = state.stream_clients, "Added stream client");

        if let Err(e) = self.transition(&mut state, CameraMode::Streaming) {
            state.stream_clients -= 1;
            warn!(clients = state.stream_clients, "Released stream client after failed start");
            return Err(e);
        }
        Ok(state.stream_clients)
    }

    /// Unregister a stream client; the last one out stops the camera
    ///
    /// Returns the remaining client count.
    pub fn remove_stream_client(&self) -> CameraResult<usize> {
        let mut state = self.lock_state();
        if state.stream_clients == 0 {
            warn!("Stream client removed without being registered");
            // A previous stop may have failed and left the camera recording
            if state.mode == CameraMode::Streaming {
                self.transition(&mut state, CameraMode::Idle)?;
            }
            return Ok(0);
        }

        state.stream_clients -= 1;
        info!(clients = state.stream_clients, "Removed stream client");

        if state.stream_clients == 0 && state.mode == CameraMode::Streaming {
            self.transition(&mut state, CameraMode::Idle)?;
        }
        Ok(state.stream_clients)
    }

    /// Time since the last still capture, or a very large sentinel
    ///
    /// Only touches the still cache, never the controller lock.
    pub fn time_since_last_still_capture(&self) -> Duration {
        self.still_cache.time_since_capture()
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn capture_and_resume(&self, state: &mut ControllerState) -> CameraResult<()> {
        let captured = self.transition(state, CameraMode::CapturingStill);

        let resume = if state.stream_clients > 0 {
            CameraMode::Streaming
        } else {
            CameraMode::Idle
        };
        let resumed = self.transition(state, resume);

        captured.and(resumed)
    }

    /// The only place `mode` changes
    fn transition(&self, state: &mut ControllerState, target: CameraMode) -> CameraResult<()> {
        if state.mode == target {
            return Ok(());
        }

        let previous = state.mode;
        debug!(from = %previous, to = %target, "Camera mode transition");

        Self::exit(state.hardware.as_mut(), previous)
            .map_err(|source| CameraError::ExitFailed { mode: previous, source })?;

        state.mode = target;

        if let Err(source) = self.enter(state.hardware.as_mut(), target) {
            error!(mode = %target, error = %source, "Failed to enter camera mode");
            if let Err(e) = Self::exit(state.hardware.as_mut(), target) {
                warn!(error = %e, "Failed to stop camera after failed start");
            }
            state.mode = CameraMode::Idle;
            return Err(CameraError::EntryFailed { mode: target, source });
        }

        Ok(())
    }

    fn exit(
        hardware: &mut dyn CameraHardware,
        mode: CameraMode,
    ) -> Result<(), crate::backends::camera::BackendError> {
        match mode {
            CameraMode::Idle => Ok(()),
            CameraMode::CapturingStill => {
                debug!("Stopping still capture mode");
                hardware.stop()
            }
            CameraMode::Streaming => {
                debug!("Stopping stream recording");
                hardware.stop_recording()
            }
        }
    }

    fn enter(
        &self,
        hardware: &mut dyn CameraHardware,
        mode: CameraMode,
    ) -> Result<(), crate::backends::camera::BackendError> {
        match mode {
            CameraMode::Idle => {
                info!("Camera is idling");
                Ok(())
            }
            CameraMode::CapturingStill => {
                info!(resolution = %self.settings.still_resolution, "Switching to still capture");
                hardware.configure(CaptureProfile::Still(self.settings.still_resolution))?;
                hardware.start()?;

                std::thread::sleep(self.settings.settle_delay);

                let started = Instant::now();
                let mut still = self.still_cache.lock();
                let jpeg = hardware.capture_jpeg()?;
                let bytes = jpeg.len();
                still.store(jpeg);
                drop(still);

                info!(
                    bytes,
                    capture_ms = started.elapsed().as_millis() as u64,
                    "Captured still image"
                );
                Ok(())
            }
            CameraMode::Streaming => {
                info!(resolution = %self.settings.video_resolution, "Switching to video capture");
                hardware.configure(CaptureProfile::Video(self.settings.video_resolution))?;
                hardware.start_recording(Arc::new(self.frame_relay.clone()))
            }
        }
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = Self::exit(state.hardware.as_mut(), state.mode) {
            warn!(error = %e, "Failed to stop camera on shutdown");
        }
        state.mode = CameraMode::Idle;
    }
}
