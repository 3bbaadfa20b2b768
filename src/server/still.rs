// SPDX-License-Identifier: GPL-3.0-only

//! `/still.jpg`: cached high resolution still

use super::{AppState, query};
use crate::camera::StillImage;
use crate::errors::RequestError;
use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `Last-Modified` value, always in GMT
pub fn http_date(time: &DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub(super) async fn still_jpg(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, RequestError> {
    let max_age = query::max_still_age(query.as_deref())?;
    let controller = Arc::clone(&state.controller);

    // Staleness check, capture and snapshot all touch blocking mutexes
    let still: StillImage = tokio::task::spawn_blocking(move || {
        let age = controller.time_since_last_still_capture();
        if controller.still_cache().is_stale(max_age) {
            info!(
                age_secs = age.as_secs_f64(),
                max_age_secs = max_age.as_secs(),
                "Refreshing stale still"
            );
            if let Err(e) = controller.refresh_still_if_older_than(max_age) {
                warn!(error = %e, "Still capture failed, serving cached image");
            }
        } else {
            debug!(age_secs = age.as_secs_f64(), "Reusing cached still");
        }
        controller.still_cache().snapshot()
    })
    .await?;

    if still.is_empty() {
        return Err(RequestError::Unavailable(
            "no still image has been captured".to_string(),
        ));
    }

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/jpeg")
        .header(header::CONTENT_LENGTH, still.data.len())
        .header(header::CACHE_CONTROL, "no-cache");
    if let Some(captured) = &still.captured_wall {
        response = response.header(header::LAST_MODIFIED, http_date(captured));
    }

    response
        .body(Body::from(still.data))
        .map_err(|e| RequestError::Internal(e.to_string()))
}
