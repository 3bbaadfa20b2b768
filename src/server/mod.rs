// SPDX-License-Identifier: GPL-3.0-only

//! HTTP interface
//!
//! | Route | Response |
//! |---|---|
//! | `/` | redirect to `/index.html` |
//! | `/index.html` | page embedding the stream and the still |
//! | `/stream.mjpg[?fps=N]` | live MJPEG stream |
//! | `/still.jpg[?maxAgeSeconds=N]` | cached still, refreshed when stale |
//! | `/temp` | host temperature in degrees Celsius |
//!
//! Anything else is a 404.

pub mod pages;
pub mod query;
mod still;
mod stream;

pub use still::http_date;
pub use stream::{StreamRegistration, encode_part};

use crate::backends::sensor::TemperatureSensor;
use crate::camera::CameraController;
use crate::constants::network::LISTEN_BACKLOG;
use crate::errors::{AppError, AppResult, RequestError};
use axum::Router;
use axum::extract::{OriginalUri, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Shared state of all handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<CameraController>,
    pub sensor: Arc<dyn TemperatureSensor>,
    /// Rendered once at startup
    pub index_page: Arc<str>,
}

impl AppState {
    pub fn new(
        controller: Arc<CameraController>,
        sensor: Arc<dyn TemperatureSensor>,
        page_title: &str,
    ) -> Self {
        Self {
            controller,
            sensor,
            index_page: pages::index_html(page_title).into(),
        }
    }
}

/// Build the router serving every route
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(redirect_to_index))
        .route("/index.html", get(index))
        .route("/stream.mjpg", get(stream::stream_mjpg))
        .route("/still.jpg", get(still::still_jpg))
        .route("/temp", get(temperature))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listening socket with address reuse enabled
pub fn bind(addr: SocketAddr) -> AppResult<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .map_err(|e| AppError::Server(format!("Failed to bind to {}: {}", addr, e)))?;
    Ok(socket.listen(LISTEN_BACKLOG)?)
}

/// Serve until the listener fails
///
/// Every connection runs on its own task, so a long-lived stream never
/// delays other requests.
pub async fn serve(listener: TcpListener, state: AppState) -> AppResult<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Camera server listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .await
        .map_err(|e| AppError::Server(e.to_string()))
}

async fn redirect_to_index() -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, "/index.html")],
    )
        .into_response()
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.index_page.to_string())
}

async fn temperature(State(state): State<AppState>) -> Result<String, RequestError> {
    let celsius = state.sensor.read_celsius()?;
    debug!(celsius, "Read temperature");
    Ok(celsius.to_string())
}

async fn not_found(OriginalUri(uri): OriginalUri) -> RequestError {
    RequestError::NotFound(uri.path().to_string())
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = match &self {
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
            RequestError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RequestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match status {
            StatusCode::NOT_FOUND => debug!(error = %self, "Request failed"),
            StatusCode::INTERNAL_SERVER_ERROR => error!(error = %self, "Request failed"),
            _ => warn!(error = %self, "Request failed"),
        }

        (status, self.to_string()).into_response()
    }
}
