// SPDX-License-Identifier: MPL-2.0

//! Camera frame sources
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  FrameSource (trait) │  GStreamer camera, image replay, test doubles
//! └──────────┬───────────┘
//!            │ FrameSink::deliver (keep-latest, bounded by FrameBudget)
//!            ▼
//! ┌──────────────────────┐
//! │   LatestFrameSlot    │  at most one pending frame
//! └──────────┬───────────┘
//!            │ analysis worker thread
//!            ▼
//! ┌──────────────────────┐
//! │   frame handler      │  FrameAnalyzer::analyze
//! └──────────────────────┘
//! ```
//!
//! A [`CameraSession`] binds one source to one worker for as long as the
//! camera screen is visible. Stopping the session stops delivery, releases
//! the pending frame and joins the worker; the source can be bound again by
//! the next session.

pub mod delivery;
pub mod file_source;
pub mod frame;
pub mod frame_loop;
pub mod pipeline;
pub mod types;

pub use delivery::{Delivery, FrameSink, LatestFrameSlot, PreviewHandle, SlotTake};
pub use file_source::FileFrameSource;
pub use frame::{Frame, FrameBudget, FramePermit};
pub use pipeline::{GstFrameSource, enumerate_cameras};
pub use types::*;

use crate::constants::camera as camera_consts;
use frame_loop::{LoopAction, WorkerController};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Something that pushes camera frames into a [`FrameSink`]
///
/// `start` and `stop` may be called repeatedly; every `start` gets a fresh
/// sink. After `stop` returns the source must not deliver any more frames.
pub trait FrameSource: Send {
    /// Short name for logging
    fn name(&self) -> String;

    /// Begin delivering frames into `sink`
    fn start(&mut self, sink: FrameSink) -> BackendResult<()>;

    /// Stop delivering frames
    fn stop(&mut self);
}

/// A frame source shared between the shell and the session that binds it
pub type SharedSource = Arc<Mutex<Box<dyn FrameSource>>>;

/// Wrap a source for use with [`CameraSession`]
pub fn shared_source(source: impl FrameSource + 'static) -> SharedSource {
    Arc::new(Mutex::new(Box::new(source)))
}

fn lock_source(source: &SharedSource) -> MutexGuard<'_, Box<dyn FrameSource>> {
    source.lock().unwrap_or_else(|e| e.into_inner())
}

/// Binding of a frame source to an analysis worker
pub struct CameraSession {
    source: SharedSource,
    slot: Arc<LatestFrameSlot>,
    budget: Arc<FrameBudget>,
    preview: PreviewHandle,
    worker: WorkerController,
    stopped: bool,
}

impl CameraSession {
    /// Start delivering frames from `source` to `on_frame`
    ///
    /// `on_frame` runs on the session's single worker thread, one frame at a
    /// time, and takes over the release obligation of each frame.
    pub fn start<F>(source: SharedSource, mut on_frame: F) -> BackendResult<Self>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        let slot = LatestFrameSlot::new();
        let budget = FrameBudget::new(camera_consts::MAX_OUTSTANDING_FRAMES);
        let preview = PreviewHandle::default();

        let worker_slot = Arc::clone(&slot);
        let mut worker = WorkerController::start(camera_consts::WORKER_NAME, move || {
            match worker_slot.take_timeout(camera_consts::WORKER_POLL_INTERVAL) {
                SlotTake::Frame(frame) => {
                    on_frame(frame);
                    LoopAction::Continue
                }
                SlotTake::Empty => LoopAction::Continue,
                SlotTake::Closed => LoopAction::Stop,
            }
        });

        let sink = FrameSink::new(Arc::clone(&slot), Arc::clone(&budget), preview.clone());
        let name = {
            let mut guard = lock_source(&source);
            let name = guard.name();
            if let Err(e) = guard.start(sink) {
                drop(guard);
                slot.close();
                worker.stop();
                return Err(e);
            }
            name
        };

        info!(source = %name, "Camera session started");

        Ok(Self {
            source,
            slot,
            budget,
            preview,
            worker,
            stopped: false,
        })
    }

    /// Most recent image for display
    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// Permit accounting of this session's frames
    pub fn budget(&self) -> &Arc<FrameBudget> {
        &self.budget
    }

    pub fn is_running(&self) -> bool {
        !self.stopped && self.worker.is_running()
    }

    /// Tear the binding down
    ///
    /// Stops the source, releases the pending frame and joins the worker.
    /// Frames already handed to the handler are released by whoever holds them.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        lock_source(&self.source).stop();
        self.slot.close();
        self.worker.stop();
        self.preview.clear();

        debug!(
            dropped = self.slot.dropped(),
            outstanding = self.budget.outstanding(),
            "Camera session frame accounting"
        );
        info!("Camera session stopped");
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
