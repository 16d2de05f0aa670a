// SPDX-License-Identifier: GPL-3.0-only

//! Frame handles with exactly-once release
//!
//! A source hands out [`Frame`]s backed by a permit from its [`FrameBudget`].
//! Releasing consumes the frame, so a second release cannot be written.
//! A frame that is dropped without an explicit release gives its permit back
//! as well. A frame that is kept forever holds its permit forever, and once
//! the budget is exhausted the source stops delivering.

use super::types::CameraFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::trace;

/// Bounded count of frames a source may have outstanding
#[derive(Debug)]
pub struct FrameBudget {
    limit: usize,
    outstanding: AtomicUsize,
    issued: AtomicU64,
    released: AtomicU64,
}

impl FrameBudget {
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            outstanding: AtomicUsize::new(0),
            issued: AtomicU64::new(0),
            released: AtomicU64::new(0),
        })
    }

    /// Check out a permit, or `None` when every permit is in use
    pub fn try_acquire(self: &Arc<Self>) -> Option<FramePermit> {
        let mut current = self.outstanding.load(Ordering::Acquire);
        loop {
            if current >= self.limit {
                return None;
            }
            match self.outstanding.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        let sequence = self.issued.fetch_add(1, Ordering::Relaxed);
        Some(FramePermit {
            budget: Arc::clone(self),
            sequence,
        })
    }

    /// Frames handed out and not yet released
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Total permits ever handed out
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }

    /// Total permits ever given back
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Acquire)
    }
}

/// One checked-out unit of a [`FrameBudget`]; gives itself back on drop
#[derive(Debug)]
pub struct FramePermit {
    budget: Arc<FrameBudget>,
    sequence: u64,
}

impl FramePermit {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        self.budget.released.fetch_add(1, Ordering::AcqRel);
        self.budget.outstanding.fetch_sub(1, Ordering::AcqRel);
        trace!(sequence = self.sequence, "Frame released");
    }
}

/// A delivered frame: an optional image buffer plus its release obligation
#[derive(Debug)]
pub struct Frame {
    image: Option<Arc<CameraFrame>>,
    permit: FramePermit,
}

impl Frame {
    pub fn new(image: Option<Arc<CameraFrame>>, permit: FramePermit) -> Self {
        Self { image, permit }
    }

    /// The image buffer, if the source produced a usable one
    pub fn image(&self) -> Option<&Arc<CameraFrame>> {
        self.image.as_ref()
    }

    /// Capture order within the source
    pub fn sequence(&self) -> u64 {
        self.permit.sequence()
    }

    /// Hand the buffer back to the source
    pub fn release(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;

    #[test]
    fn test_budget_exhausts_and_recovers() {
        let budget = FrameBudget::new(2);
        let a = budget.try_acquire().unwrap();
        let _b = budget.try_acquire().unwrap();
        assert!(budget.try_acquire().is_none());
        assert_eq!(budget.outstanding(), 2);

        drop(a);
        assert_eq!(budget.outstanding(), 1);
        assert!(budget.try_acquire().is_some());
    }

    #[test]
    fn test_frame_release_returns_permit_once() {
        let budget = FrameBudget::new(1);
        let image = Arc::new(CameraFrame::packed(1, 1, PixelFormat::Gray8, vec![0u8]));
        let frame = Frame::new(Some(image), budget.try_acquire().unwrap());
        assert_eq!(frame.sequence(), 0);
        assert!(frame.image().is_some());

        frame.release();
        assert_eq!(budget.outstanding(), 0);
        assert_eq!(budget.issued(), 1);
        assert_eq!(budget.released(), 1);
    }

    #[test]
    fn test_dropped_frame_is_released() {
        let budget = FrameBudget::new(1);
        {
            let _frame = Frame::new(None, budget.try_acquire().unwrap());
        }
        assert_eq!(budget.released(), 1);
        assert_eq!(budget.outstanding(), 0);
    }
}
