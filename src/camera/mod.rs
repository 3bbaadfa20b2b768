// SPDX-License-Identifier: GPL-3.0-only

//! Camera session management
//!
//! - [`controller`]: mode state machine owning the hardware
//! - [`still_cache`]: most recent still image
//! - [`frame_relay`]: latest live frame, shared with stream clients

pub mod controller;
pub mod frame_relay;
pub mod still_cache;

pub use controller::{CameraController, CameraMode, ControllerSettings, ControllerStatus};
pub use frame_relay::{FrameRelay, FrameSubscription};
pub use still_cache::{StillCache, StillImage};
