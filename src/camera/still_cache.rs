// SPDX-License-Identifier: GPL-3.0-only

//! Most recent still capture
//!
//! Guarded by its own mutex, independent of the controller. Lock order is
//! controller first, cache second: the controller holds this lock while the
//! camera writes a capture, and nothing may wait on the controller while
//! holding it.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::constants::still::NEVER_CAPTURED;

/// Contents of the cache
#[derive(Debug, Clone, Default)]
pub struct StillImage {
    /// Encoded JPEG, empty before the first capture
    pub data: Bytes,
    /// Monotonic capture time used for staleness
    pub captured_at: Option<Instant>,
    /// Wall clock capture time for `Last-Modified`
    pub captured_wall: Option<DateTime<Utc>>,
}

impl StillImage {
    /// Replace the image and stamp it with the current time
    pub fn store(&mut self, data: Bytes) {
        self.data = data;
        self.captured_at = Some(Instant::now());
        self.captured_wall = Some(Utc::now());
    }

    /// Time since capture, `None` before the first capture
    pub fn age(&self) -> Option<Duration> {
        self.captured_at.map(|t| t.elapsed())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Older than `max_age`, or never captured
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age().is_none_or(|age| age > max_age)
    }
}

#[derive(Debug, Default)]
pub struct StillCache {
    image: Mutex<StillImage>,
}

impl StillCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the cache for a capture or a consistent read
    pub fn lock(&self) -> MutexGuard<'_, StillImage> {
        self.image.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current image
    ///
    /// The JPEG bytes are reference counted, so this is cheap and the copy
    /// stays valid after a later capture replaces the cache.
    pub fn snapshot(&self) -> StillImage {
        self.lock().clone()
    }

    /// Time since the last capture, or [`NEVER_CAPTURED`]
    pub fn time_since_capture(&self) -> Duration {
        self.lock().age().unwrap_or(NEVER_CAPTURED)
    }

    /// Whether a request accepting stills up to `max_age` old needs a capture
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.lock().is_stale(max_age)
    }
}
