// SPDX-License-Identifier: GPL-3.0-only

//! HTTP route tests against a mock camera

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use camera_server::backends::sensor::TemperatureSensor;
use camera_server::camera::{CameraController, CameraMode};
use camera_server::errors::SensorError;
use camera_server::server::{AppState, router};
use common::{MockHandle, Op, mock_controller};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tower::ServiceExt;

struct FixedSensor(Option<f64>);

impl TemperatureSensor for FixedSensor {
    fn read_celsius(&self) -> Result<f64, SensorError> {
        self.0
            .ok_or_else(|| SensorError::Unavailable("no thermal zone".into()))
    }
}

fn state(controller: &Arc<CameraController>, celsius: Option<f64>) -> AppState {
    AppState::new(Arc::clone(controller), Arc::new(FixedSensor(celsius)), "test-cam")
}

async fn get(state: AppState, uri: &str) -> Response {
    router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Emits a mock frame every few milliseconds until dropped
struct FrameDriver(Arc<AtomicBool>);

impl FrameDriver {
    fn start(camera: Arc<MockHandle>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        tokio::spawn(async move {
            while flag.load(Ordering::SeqCst) {
                camera.emit_frame();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        Self(running)
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn wait_for_clients(controller: &CameraController, expected: usize) {
    for _ in 0..200 {
        if controller.stream_client_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} stream clients, have {}",
        expected,
        controller.stream_client_count()
    );
}

async fn next_chunk(body: &mut Body) -> bytes::Bytes {
    let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("timed out waiting for a stream part")
        .expect("stream ended")
        .expect("stream failed");
    frame.into_data().expect("expected a data frame")
}

#[tokio::test]
async fn test_root_redirects_to_index() {
    let (controller, _camera) = mock_controller();
    let response = get(state(&controller, None), "/").await;

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "/index.html");
}

#[tokio::test]
async fn test_index_page() {
    let (controller, _camera) = mock_controller();
    let response = get(state(&controller, None), "/index.html").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let page = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
    assert!(page.contains("<h1>test-cam</h1>"));
    assert!(page.contains("stream.mjpg"));
    assert!(page.contains("still.jpg"));
}

#[tokio::test]
async fn test_unknown_paths_are_not_found() {
    let (controller, _camera) = mock_controller();
    for uri in ["/favicon.ico", "/index.htm", "/still.jpg/extra", "/temp/1"] {
        let response = get(state(&controller, None), uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_temperature() {
    let (controller, _camera) = mock_controller();

    let response = get(state(&controller, Some(48.5)), "/temp").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], b"48.5");

    let response = get(state(&controller, None), "/temp").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_still_is_captured_then_reused() {
    let (controller, camera) = mock_controller();

    let response = get(state(&controller, None), "/still.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert!(response.headers().contains_key(header::LAST_MODIFIED));
    let length: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let first = body_bytes(response).await;
    assert_eq!(first.len(), length);
    assert_eq!(camera.captures(), 1);

    // Clamped to one second, so an immediate retry reuses the cache
    let response = get(state(&controller, None), "/still.jpg?maxAgeSeconds=0").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, first);
    assert_eq!(camera.captures(), 1);
    assert_eq!(controller.mode(), CameraMode::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stale_still_is_refreshed() {
    let (controller, camera) = mock_controller();
    controller.capture_still_and_resume().unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let response = get(state(&controller, None), "/still.jpg?1").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(camera.captures(), 2);
    assert_eq!(&body_bytes(response).await[..], "\u{FF}still-2".as_bytes());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_still_unavailable_without_any_capture() {
    let (controller, camera) = mock_controller();
    camera.fail(Op::Capture);

    let response = get(state(&controller, None), "/still.jpg").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(controller.mode(), CameraMode::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_empty_cache_is_captured_despite_large_max_age() {
    let (controller, camera) = mock_controller();
    camera.fail(Op::Capture);
    assert!(controller.capture_still_and_resume().is_err());
    assert_eq!(camera.captures(), 0);

    camera.succeed(Op::Capture);
    let response = get(state(&controller, None), "/still.jpg?maxAgeSeconds=20000").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(camera.captures(), 1);
    assert_eq!(&body_bytes(response).await[..], "\u{FF}still-1".as_bytes());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_refresh_serves_previous_still() {
    let (controller, camera) = mock_controller();
    controller.capture_still_and_resume().unwrap();
    camera.fail(Op::Capture);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let response = get(state(&controller, None), "/still.jpg?maxAgeSeconds=1").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], "\u{FF}still-1".as_bytes());
}

#[tokio::test]
async fn test_bad_query_values_are_rejected() {
    let (controller, camera) = mock_controller();

    for uri in ["/still.jpg?maxAgeSeconds=later", "/stream.mjpg?fps=0", "/stream.mjpg?fast"] {
        let response = get(state(&controller, None), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
    assert_eq!(controller.stream_client_count(), 0);
    assert!(camera.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_headers_and_parts() {
    let (controller, camera) = mock_controller();
    let _driver = FrameDriver::start(Arc::clone(&camera));

    let response = get(state(&controller, None), "/stream.mjpg?fps=1000").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=FRAME"
    );
    assert_eq!(response.headers()[header::AGE], "0");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache, private");
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    assert_eq!(controller.stream_client_count(), 1);
    assert_eq!(controller.mode(), CameraMode::Streaming);

    let mut body = response.into_body();
    for _ in 0..3 {
        let part = next_chunk(&mut body).await;
        assert!(part.starts_with(b"--FRAME\r\nContent-Type: image/jpeg\r\nContent-Length: "));
        assert!(part.ends_with(b"\r\n"));
    }

    drop(body);
    wait_for_clients(&controller, 0).await;
    assert_eq!(controller.mode(), CameraMode::Idle);
    assert!(!camera.is_recording());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_each_stream_client_is_counted_once() {
    let (controller, camera) = mock_controller();
    let _driver = FrameDriver::start(Arc::clone(&camera));

    let first = get(state(&controller, None), "/stream.mjpg").await;
    let second = get(state(&controller, None), "/stream.mjpg?30").await;
    assert_eq!(controller.stream_client_count(), 2);

    drop(first);
    wait_for_clients(&controller, 1).await;
    assert_eq!(controller.mode(), CameraMode::Streaming);

    drop(second);
    wait_for_clients(&controller, 0).await;
    assert_eq!(controller.mode(), CameraMode::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_start_failure_is_unavailable() {
    let (controller, camera) = mock_controller();
    camera.fail(Op::StartRecording);

    let response = get(state(&controller, None), "/stream.mjpg").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(controller.stream_client_count(), 0);
    assert_eq!(controller.mode(), CameraMode::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_still_request_pauses_stream_without_dropping_it() {
    let (controller, camera) = mock_controller();
    let _driver = FrameDriver::start(Arc::clone(&camera));

    let stream = get(state(&controller, None), "/stream.mjpg?fps=100").await;
    let mut body = stream.into_body();
    next_chunk(&mut body).await;

    camera.set_capture_delay(Duration::from_millis(100));
    let still = get(state(&controller, None), "/still.jpg").await;
    assert_eq!(still.status(), StatusCode::OK);
    assert_eq!(camera.captures(), 1);

    // Registration survived the still capture and frames flow again
    assert_eq!(controller.stream_client_count(), 1);
    assert_eq!(controller.mode(), CameraMode::Streaming);
    let part = next_chunk(&mut body).await;
    assert!(part.starts_with(b"--FRAME\r\n"));

    drop(body);
    wait_for_clients(&controller, 0).await;
}
