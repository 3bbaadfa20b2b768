// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot broadcast of live video frames
//!
//! The relay holds only the newest frame. Writers replace it and wake every
//! waiting subscriber; a subscriber that is slow simply sees whichever frame
//! is newest when it wakes. Skipping frames is intended: a live view wants
//! the freshest image, not a backlog.

use crate::backends::camera::{FrameOutput, JpegFrame};
use std::sync::Arc;
use tokio::sync::watch;

/// Latest-value channel shared by the recording backend and stream clients
#[derive(Clone)]
pub struct FrameRelay {
    slot: Arc<watch::Sender<Option<JpegFrame>>>,
}

impl FrameRelay {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Replace the slot and wake all waiters
    ///
    /// Callable from any thread; never blocks on subscribers.
    pub fn put(&self, frame: JpegFrame) {
        self.slot.send_replace(Some(frame));
    }

    /// Create a subscription for one consumer
    pub fn subscribe(&self) -> FrameSubscription {
        FrameSubscription {
            rx: self.slot.subscribe(),
        }
    }

    /// The frame currently in the slot
    pub fn latest(&self) -> Option<JpegFrame> {
        self.slot.borrow().clone()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.slot.receiver_count()
    }
}

impl Default for FrameRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameOutput for FrameRelay {
    fn write_frame(&self, frame: JpegFrame) {
        self.put(frame);
    }
}

/// One consumer's view of a [`FrameRelay`]
pub struct FrameSubscription {
    rx: watch::Receiver<Option<JpegFrame>>,
}

impl FrameSubscription {
    /// Wait for the next `put` that happens after this call starts
    ///
    /// A frame already sitting in the slot is never returned, even if this
    /// subscription has not seen it. Returns `None` once every
    /// [`FrameRelay`] handle is gone.
    pub async fn wait(&mut self) -> Option<JpegFrame> {
        self.rx.mark_unchanged();
        loop {
            self.rx.changed().await.ok()?;
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }

    /// The frame currently in the slot, without waiting
    pub fn peek(&self) -> Option<JpegFrame> {
        self.rx.borrow().clone()
    }
}
