// SPDX-License-Identifier: GPL-3.0-only

use camera_server::backends::camera::{CameraBackendType, get_backend};
use camera_server::backends::sensor::ThermalZoneSensor;
use camera_server::camera::{CameraController, CameraMode};
use camera_server::config::Config;
use camera_server::constants::app_info;
use camera_server::server::{self, AppState};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod cli;

#[derive(Parser)]
#[command(name = "camera-server")]
#[command(about = "Serve a camera as a cached still image and a live MJPEG stream")]
#[command(version = app_info::version())]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Camera backend
    #[arg(long, value_enum)]
    backend: Option<CameraBackendType>,

    /// V4L2 device node
    #[arg(short, long)]
    device: Option<String>,

    /// Run without the interactive console
    #[arg(long)]
    service: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(device) = &self.device {
            config.device_path = device.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_server=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    info!(
        version = app_info::version(),
        backend = %config.backend,
        addr = %config.socket_addr(),
        "Starting camera server"
    );

    let hardware = get_backend(config.backend, &config.backend_options())?;
    let controller = Arc::new(CameraController::new(
        hardware,
        config.controller_settings(),
    ));

    // Warm the still cache so the first request is served immediately
    let warmup = Arc::clone(&controller);
    match tokio::task::spawn_blocking(move || warmup.capture_still_and_resume()).await? {
        Ok(()) => info!("Initial still captured"),
        Err(e) => warn!(error = %e, "Initial still capture failed"),
    }

    let sensor = Arc::new(ThermalZoneSensor::new(&config.thermal_zone_path));
    let state = AppState::new(Arc::clone(&controller), sensor, &config.page_title);
    let listener = server::bind(config.socket_addr())?;

    if cli.service {
        tokio::select! {
            result = server::serve(listener, state) => result?,
            _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        }
    } else {
        let server_task = tokio::spawn(server::serve(listener, state));
        tokio::select! {
            result = cli::run(Arc::clone(&controller)) => result?,
            _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        }
        server_task.abort();
        if let Ok(Err(e)) = server_task.await {
            error!(error = %e, "Server stopped with an error");
        }
    }

    // Stop the camera session before exiting
    if let Err(e) = tokio::task::spawn_blocking(move || controller.set_mode(CameraMode::Idle)).await? {
        warn!(error = %e, "Failed to stop camera");
    }

    info!("Camera server exited");
    Ok(())
}
