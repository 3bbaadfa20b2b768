// SPDX-License-Identifier: GPL-3.0-only

//! Camera server
//!
//! Shares one camera between any number of HTTP clients. Clients either ask
//! for a high resolution still, which is cached and refreshed on demand, or
//! watch a live MJPEG stream that runs while at least one of them is
//! connected. The camera can only do one of these at a time, so a mode
//! state machine owns it and serializes every switch.
//!
//! - [`backends`]: camera hardware and host sensors
//! - [`camera`]: mode controller, still cache and frame relay
//! - [`server`]: HTTP routes
//! - [`config`]: JSON configuration
//! - [`errors`]: error types

pub mod backends;
pub mod camera;
pub mod config;
pub mod constants;
pub mod errors;
pub mod server;

pub use camera::{CameraController, CameraMode, ControllerSettings, FrameRelay, StillCache};
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError, CameraResult, RequestError};
