// SPDX-License-Identifier: GPL-3.0-only

//! Operator console
//!
//! When not running as a service the server reads one command per line from
//! stdin:
//!
//! | Command | Effect |
//! |---|---|
//! | `c`, `capture` | capture a still, then resume |
//! | `i`, `idle` | force the camera idle |
//! | `s`, `stream` | register a console stream client |
//! | `x`, `stop-stream` | release a stream client |
//! | `p`, `print` | print mode and client count |
//! | `a` | liveness check |
//! | `q`, `quit` | exit |

use camera_server::camera::{CameraController, CameraMode};
use camera_server::errors::CameraError;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// One console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Capture,
    Idle,
    Stream,
    StopStream,
    Print,
    Alive,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "c" | "capture" => Ok(Self::Capture),
            "i" | "idle" => Ok(Self::Idle),
            "s" | "stream" => Ok(Self::Stream),
            "x" | "stop-stream" => Ok(Self::StopStream),
            "p" | "print" => Ok(Self::Print),
            "a" => Ok(Self::Alive),
            "q" | "quit" => Ok(Self::Quit),
            other => Err(format!("unknown command {:?}", other)),
        }
    }
}

impl ConsoleCommand {
    /// Run the command against the controller and describe the result
    ///
    /// Blocks while the camera switches mode. `Quit` does nothing here; the
    /// console loop handles it.
    pub fn execute(self, controller: &CameraController) -> Result<String, CameraError> {
        match self {
            Self::Capture => {
                controller.capture_still_and_resume()?;
                let bytes = controller.still_cache().snapshot().data.len();
                Ok(format!("captured still ({} bytes)", bytes))
            }
            Self::Idle => {
                controller.set_mode(CameraMode::Idle)?;
                Ok("camera idle".to_string())
            }
            Self::Stream => {
                let clients = controller.add_stream_client()?;
                Ok(format!("streaming, {} client(s)", clients))
            }
            Self::StopStream => {
                let clients = controller.remove_stream_client()?;
                Ok(format!("{} stream client(s) left", clients))
            }
            Self::Print => {
                let status = controller.status();
                Ok(format!(
                    "state: {} ({} stream client(s), still age {:.1}s)",
                    status.mode,
                    status.stream_clients,
                    controller.time_since_last_still_capture().as_secs_f64()
                ))
            }
            Self::Alive => Ok("alive".to_string()),
            Self::Quit => Ok("bye".to_string()),
        }
    }
}

/// Read commands from stdin until `quit` or end of input
pub async fn run(controller: Arc<CameraController>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            info!("Console input closed");
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(e) => {
                stdout.write_all(format!("{}\n", e).as_bytes()).await?;
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            info!("Quit requested from console");
            return Ok(());
        }

        let controller = Arc::clone(&controller);
        let message = match tokio::task::spawn_blocking(move || command.execute(&controller)).await
        {
            Ok(Ok(message)) => message,
            Ok(Err(e)) => {
                warn!(?command, error = %e, "Console command failed");
                format!("failed: {}", e)
            }
            Err(e) => format!("failed: {}", e),
        };
        stdout.write_all(format!("{}\n", message).as_bytes()).await?;
    }
}
