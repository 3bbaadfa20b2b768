// SPDX-License-Identifier: GPL-3.0-only

//! `/stream.mjpg`: live MJPEG over `multipart/x-mixed-replace`
//!
//! Each connection registers as a stream client for as long as its body is
//! alive. The registration is released exactly once, whether the client
//! disconnects, the body errors, or the handler is cancelled before the
//! response is sent.

use super::{AppState, query};
use crate::backends::camera::JpegFrame;
use crate::camera::CameraController;
use crate::constants::{stream::MJPEG_BOUNDARY, timing::FRAME_LOG_INTERVAL};
use crate::errors::{CameraResult, RequestError};
use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use bytes::{BufMut, Bytes, BytesMut};
use futures::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Claim on the streaming camera, released on drop
pub struct StreamRegistration {
    controller: Arc<CameraController>,
}

impl StreamRegistration {
    /// Register a stream client, starting the stream if needed
    ///
    /// Blocks while the camera switches mode.
    pub fn register(controller: Arc<CameraController>) -> CameraResult<Self> {
        let clients = controller.add_stream_client()?;
        debug!(clients, "Stream registration acquired");
        Ok(Self { controller })
    }

    pub fn controller(&self) -> &Arc<CameraController> {
        &self.controller
    }
}

impl Drop for StreamRegistration {
    fn drop(&mut self) {
        let controller = Arc::clone(&self.controller);
        let release = move || {
            if let Err(e) = controller.remove_stream_client() {
                warn!(error = %e, "Failed to stop stream after last client left");
            }
        };

        // Removing the last client stops the camera, which blocks
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(release);
            }
            Err(_) => release(),
        }
    }
}

/// One multipart part carrying `frame`
pub fn encode_part(frame: &JpegFrame) -> Bytes {
    let head = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        MJPEG_BOUNDARY,
        frame.len()
    );

    let mut part = BytesMut::with_capacity(head.len() + frame.len() + 2);
    part.put_slice(head.as_bytes());
    part.put_slice(&frame.data);
    part.put_slice(b"\r\n");
    part.freeze()
}

/// Body of one stream connection
///
/// Waits for a fresh frame, sends it, then sleeps `interval`. The
/// registration lives inside the stream, so dropping the body releases it.
fn mjpeg_parts(
    registration: StreamRegistration,
    interval: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        let mut frames = registration.controller().frame_relay().subscribe();
        let mut sent: u64 = 0;

        while let Some(frame) = frames.wait().await {
            yield Ok::<Bytes, Infallible>(encode_part(&frame));

            sent += 1;
            if sent % FRAME_LOG_INTERVAL == 0 {
                debug!(sent, sequence = frame.sequence, "Stream client progress");
            }

            tokio::time::sleep(interval).await;
        }

        info!(sent, "Frame relay closed, ending stream");
        drop(registration);
    }
}

pub(super) async fn stream_mjpg(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, RequestError> {
    let interval = query::frame_interval(query.as_deref())?;

    let controller = Arc::clone(&state.controller);
    let registration =
        tokio::task::spawn_blocking(move || StreamRegistration::register(controller)).await??;

    info!(
        interval_ms = interval.as_millis() as u64,
        "Starting MJPEG stream"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", MJPEG_BOUNDARY),
        )
        .header(header::AGE, "0")
        .header(header::CACHE_CONTROL, "no-cache, private")
        .header(header::PRAGMA, "no-cache")
        .body(Body::from_stream(mjpeg_parts(registration, interval)))
        .map_err(|e| RequestError::Internal(e.to_string()))
}
