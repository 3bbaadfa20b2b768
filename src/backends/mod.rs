// SPDX-License-Identifier: GPL-3.0-only

//! Hardware collaborators: the camera and the host temperature sensor

pub mod camera;
pub mod sensor;
