// SPDX-License-Identifier: GPL-3.0-only

//! Keep-latest frame delivery
//!
//! Sources push into a [`FrameSink`]. The sink keeps a preview copy and
//! places the frame in a [`LatestFrameSlot`] that holds at most one pending
//! frame: a newer frame replaces (and thereby releases) an older one the
//! analysis worker has not picked up yet.

use super::frame::{Frame, FrameBudget};
use super::types::CameraFrame;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace};

/// Result of waiting on the slot
#[derive(Debug)]
pub enum SlotTake {
    /// A frame was pending
    Frame(Frame),
    /// Nothing arrived within the timeout
    Empty,
    /// The slot was closed; no more frames will arrive
    Closed,
}

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<Frame>,
    closed: bool,
    dropped: u64,
}

/// Single-entry mailbox between a frame source and the analysis worker
#[derive(Debug, Default)]
pub struct LatestFrameSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl LatestFrameSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // A poisoned slot only ever holds plain data; keep using it
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Offer a frame; returns true when an older pending frame was dropped
    ///
    /// Frames offered after `close` are released immediately.
    pub fn offer(&self, frame: Frame) -> bool {
        let replaced = {
            let mut state = self.lock();
            if state.closed {
                trace!(sequence = frame.sequence(), "Slot closed, releasing frame");
                return false;
            }
            let replaced = state.pending.replace(frame);
            if replaced.is_some() {
                state.dropped += 1;
            }
            replaced
        };
        self.ready.notify_one();

        // Release outside the lock
        match replaced {
            Some(old) => {
                trace!(sequence = old.sequence(), "Dropping undelivered frame");
                old.release();
                true
            }
            None => false,
        }
    }

    /// Wait up to `timeout` for a pending frame
    pub fn take_timeout(&self, timeout: Duration) -> SlotTake {
        let mut state = self.lock();
        if let Some(frame) = state.pending.take() {
            return SlotTake::Frame(frame);
        }
        if state.closed {
            return SlotTake::Closed;
        }

        state = match self.ready.wait_timeout(state, timeout) {
            Ok((guard, _)) => guard,
            Err(e) => e.into_inner().0,
        };

        match state.pending.take() {
            Some(frame) => SlotTake::Frame(frame),
            None if state.closed => SlotTake::Closed,
            None => SlotTake::Empty,
        }
    }

    /// Stop accepting frames and release the pending one
    pub fn close(&self) {
        let pending = {
            let mut state = self.lock();
            state.closed = true;
            state.pending.take()
        };
        self.ready.notify_all();
        if let Some(frame) = pending {
            debug!(sequence = frame.sequence(), "Releasing pending frame on close");
            frame.release();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Frames replaced before the worker picked them up
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}

/// Most recent image for display
#[derive(Debug, Clone, Default)]
pub struct PreviewHandle {
    latest: Arc<Mutex<Option<Arc<CameraFrame>>>>,
}

impl PreviewHandle {
    pub fn latest(&self) -> Option<Arc<CameraFrame>> {
        self.latest.lock().ok().and_then(|guard| guard.clone())
    }

    fn set(&self, image: Arc<CameraFrame>) {
        if let Ok(mut guard) = self.latest.lock() {
            *guard = Some(image);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.latest.lock() {
            *guard = None;
        }
    }
}

/// Outcome of pushing a capture into the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame is now pending for the analyzer
    Queued,
    /// Frame is pending and replaced an older undelivered one
    Replaced,
    /// Every frame permit is in use; the capture was discarded
    Stalled,
    /// The sink was closed
    Closed,
}

/// Where a frame source delivers its captures
#[derive(Debug, Clone)]
pub struct FrameSink {
    slot: Arc<LatestFrameSlot>,
    budget: Arc<FrameBudget>,
    preview: PreviewHandle,
}

impl FrameSink {
    pub fn new(slot: Arc<LatestFrameSlot>, budget: Arc<FrameBudget>, preview: PreviewHandle) -> Self {
        Self {
            slot,
            budget,
            preview,
        }
    }

    /// Push one capture; `None` models a frame without a usable buffer
    pub fn deliver(&self, image: Option<CameraFrame>) -> Delivery {
        if self.slot.is_closed() {
            return Delivery::Closed;
        }

        let Some(permit) = self.budget.try_acquire() else {
            trace!(
                outstanding = self.budget.outstanding(),
                "Frame budget exhausted, discarding capture"
            );
            return Delivery::Stalled;
        };

        let image = image.map(Arc::new);
        if let Some(image) = &image {
            self.preview.set(Arc::clone(image));
        }

        if self.slot.offer(Frame::new(image, permit)) {
            Delivery::Replaced
        } else if self.slot.is_closed() {
            Delivery::Closed
        } else {
            Delivery::Queued
        }
    }

    pub fn budget(&self) -> &Arc<FrameBudget> {
        &self.budget
    }

    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }
}
