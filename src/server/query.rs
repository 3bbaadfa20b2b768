// SPDX-License-Identifier: GPL-3.0-only

//! Query string parameters of the image routes
//!
//! Both routes take a single number, either as a named parameter
//! (`/stream.mjpg?fps=10`) or as the whole query string
//! (`/stream.mjpg?10`).

use crate::constants::{still, stream};
use crate::errors::RequestError;
use std::time::Duration;

/// Named parameter of `/stream.mjpg`
pub const FPS_PARAM: &str = "fps";

/// Named parameter of `/still.jpg`
pub const MAX_AGE_PARAM: &str = "maxAgeSeconds";

/// Value of `key`, or the bare query string if it has no `=`
fn query_value<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    let query = query.map(str::trim).filter(|q| !q.is_empty())?;
    if !query.contains('=') {
        return Some(query);
    }
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Delay between two frames sent to one stream client
///
/// `1 / fps`, never shorter than [`stream::MIN_FRAME_INTERVAL`]. Without a
/// rate the default interval applies.
pub fn frame_interval(query: Option<&str>) -> Result<Duration, RequestError> {
    let Some(raw) = query_value(query, FPS_PARAM) else {
        return Ok(stream::DEFAULT_FRAME_INTERVAL);
    };

    let invalid = || RequestError::InvalidQuery {
        name: FPS_PARAM,
        value: raw.to_string(),
    };

    let fps: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err(invalid());
    }

    let interval = Duration::try_from_secs_f64(1.0 / fps).map_err(|_| invalid())?;
    Ok(interval.max(stream::MIN_FRAME_INTERVAL))
}

/// Oldest cached still a client accepts
///
/// Whole seconds, clamped to at least [`still::MIN_MAX_AGE`].
pub fn max_still_age(query: Option<&str>) -> Result<Duration, RequestError> {
    let Some(raw) = query_value(query, MAX_AGE_PARAM) else {
        return Ok(still::DEFAULT_MAX_AGE);
    };

    let seconds: i64 = raw.trim().parse().map_err(|_| RequestError::InvalidQuery {
        name: MAX_AGE_PARAM,
        value: raw.to_string(),
    })?;

    Ok(Duration::from_secs(seconds.max(0) as u64).max(still::MIN_MAX_AGE))
}
