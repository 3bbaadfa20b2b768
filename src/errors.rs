// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera server

use crate::backends::camera::BackendError;
use crate::camera::CameraMode;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for controller operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Top-level error for startup and the binary
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors
    Camera(CameraError),
    /// Backend could not be created
    Backend(BackendError),
    /// Configuration errors
    Config(String),
    /// Listener or server errors
    Server(String),
    /// Generic error with message
    Other(String),
}

/// A failed mode transition
///
/// Exit failures leave the mode unchanged, since the previous session is
/// assumed to still be running. Entry failures leave the camera stopped and
/// the mode `Idle`.
#[derive(Debug, Clone)]
pub enum CameraError {
    /// Stopping the current session failed
    ExitFailed {
        mode: CameraMode,
        source: BackendError,
    },
    /// Configuring or starting the target session failed
    EntryFailed {
        mode: CameraMode,
        source: BackendError,
    },
}

/// Temperature sensor errors
#[derive(Debug, Clone)]
pub enum SensorError {
    /// The sensor file is missing or unreadable
    Unavailable(String),
    /// The sensor produced something that is not a number
    Malformed(String),
}

/// Errors surfaced to HTTP clients
#[derive(Debug, Clone)]
pub enum RequestError {
    /// Unknown route or missing resource (404)
    NotFound(String),
    /// Query parameter that cannot be interpreted (400)
    InvalidQuery { name: &'static str, value: String },
    /// Camera could not serve the request (503)
    Unavailable(String),
    /// Unexpected server failure (500)
    Internal(String),
}

impl CameraError {
    /// Mode whose exit or entry action failed
    pub fn mode(&self) -> CameraMode {
        match self {
            CameraError::ExitFailed { mode, .. } | CameraError::EntryFailed { mode, .. } => *mode,
        }
    }

    /// Underlying hardware failure
    pub fn backend_error(&self) -> &BackendError {
        match self {
            CameraError::ExitFailed { source, .. } | CameraError::EntryFailed { source, .. } => {
                source
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Backend(e) => write!(f, "Camera backend error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Server(msg) => write!(f, "Server error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::ExitFailed { mode, source } => {
                write!(f, "Failed to leave {} mode: {}", mode, source)
            }
            CameraError::EntryFailed { mode, source } => {
                write!(f, "Failed to enter {} mode: {}", mode, source)
            }
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Unavailable(msg) => write!(f, "Sensor unavailable: {}", msg),
            SensorError::Malformed(raw) => write!(f, "Malformed sensor reading: {:?}", raw),
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NotFound(what) => write!(f, "Not found: {}", what),
            RequestError::InvalidQuery { name, value } => {
                write!(f, "Invalid value for {}: {:?}", name, value)
            }
            RequestError::Unavailable(msg) => write!(f, "Camera unavailable: {}", msg),
            RequestError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.backend_error())
    }
}
impl std::error::Error for SensorError {}
impl std::error::Error for RequestError {}

// Conversions from sub-errors to AppError
impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Server(err.to_string())
    }
}

impl From<CameraError> for RequestError {
    fn from(err: CameraError) -> Self {
        RequestError::Unavailable(err.to_string())
    }
}

impl From<SensorError> for RequestError {
    fn from(err: SensorError) -> Self {
        RequestError::NotFound(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RequestError {
    fn from(err: tokio::task::JoinError) -> Self {
        RequestError::Internal(format!("camera task failed: {}", err))
    }
}
