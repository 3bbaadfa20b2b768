// SPDX-License-Identifier: GPL-3.0-only

//! Thread lifecycle for continuous recording loops
//!
//! Every backend that records video runs its frame producer on a dedicated
//! thread. This is the "hardware callback context" that feeds the frame
//! relay: it is started by `start_recording` and joined by `stop_recording`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Action returned by the loop body to control the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Produce another frame
    Continue,
    /// Leave the loop
    Stop,
}

/// A recording loop running on its own thread
///
/// Dropping the loop stops it and waits for the thread.
pub struct CaptureLoop {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureLoop {
    /// Start a loop without per-thread state
    pub fn start<F>(name: &str, mut loop_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::spawn(move || {
            run_until_stopped(&thread_name, &thread_stop, || loop_fn());
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Start a loop whose state is built on the loop thread
    ///
    /// `init_fn` runs on the new thread (device handles are opened there and
    /// never cross threads). This call blocks until initialization finished
    /// and returns its error, so a device that cannot be opened is reported
    /// to the caller of `start_recording` instead of being lost in a log.
    pub fn start_with_init<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> Result<Self, String>
    where
        S: 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        info!(name = %name, "Starting capture loop with initialization");

        let thread_handle = thread::spawn(move || {
            let mut state = match init_fn() {
                Ok(state) => {
                    let _ = ready_tx.send(Ok(()));
                    state
                }
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Capture loop initialization failed");
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            run_until_stopped(&thread_name, &thread_stop, || loop_fn(&mut state));
        });

        let outcome = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(format!("capture loop '{name}' exited during initialization")));

        let mut capture_loop = Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        };

        match outcome {
            Ok(()) => Ok(capture_loop),
            Err(e) => {
                capture_loop.join();
                Err(e)
            }
        }
    }

    /// Check if the loop thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop and wait for the thread
    pub fn stop(&mut self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "Capture loop dropped, stopping");
            self.stop();
        }
    }
}

fn run_until_stopped(name: &str, stop_signal: &AtomicBool, mut step: impl FnMut() -> LoopAction) {
    debug!(name = %name, "Capture loop thread started");

    while !stop_signal.load(Ordering::SeqCst) {
        if step() == LoopAction::Stop {
            debug!(name = %name, "Loop requested stop");
            break;
        }
    }

    info!(name = %name, "Capture loop thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut capture_loop = CaptureLoop::start("test-loop", move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            if count >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        });

        capture_loop.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut capture_loop = CaptureLoop::start("test-loop", move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        });

        thread::sleep(Duration::from_millis(30));
        capture_loop.stop();
        assert!(counter.load(Ordering::SeqCst) > 0);
        assert!(!capture_loop.is_running());
    }

    #[test]
    fn test_init_state_reaches_loop() {
        let result = Arc::new(AtomicU32::new(0));
        let result_clone = Arc::clone(&result);

        let mut capture_loop = CaptureLoop::start_with_init(
            "test-init-loop",
            || Ok(42u32),
            move |state| {
                result_clone.store(*state, Ordering::SeqCst);
                LoopAction::Stop
            },
        )
        .expect("init succeeds");

        capture_loop.join();
        assert_eq!(result.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_init_failure_is_returned() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let outcome = CaptureLoop::start_with_init(
            "test-fail-init",
            || Err::<(), _>("device busy".to_string()),
            move |_: &mut ()| {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
        );

        assert_eq!(outcome.err().as_deref(), Some("device busy"));
        assert!(!ran.load(Ordering::SeqCst));
    }
}
