// SPDX-License-Identifier: GPL-3.0-only

//! Still image replay source
//!
//! Streams one image as a camera would, at a fixed frame interval. Useful
//! for running the camera path without hardware.

use super::FrameSource;
use super::delivery::{Delivery, FrameSink};
use super::frame_loop::{LoopAction, WorkerController};
use super::types::{BackendError, BackendResult, CameraFrame, PixelFormat};
use crate::constants::{file_formats, replay};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Load an image file as an RGBA camera frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(BackendError::Other(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    let img = image::open(path)
        .map_err(|e| BackendError::Other(format!("Failed to load image: {}", e)))?
        .to_rgba8();

    let (width, height) = img.dimensions();
    debug!(path = %path.display(), width, height, "Loaded replay image");

    Ok(CameraFrame::packed(
        width,
        height,
        PixelFormat::RGBA,
        img.into_raw(),
    ))
}

/// Frame source that repeats one image
pub struct FileFrameSource {
    name: String,
    frame: CameraFrame,
    interval: Duration,
    worker: Option<WorkerController>,
}

impl FileFrameSource {
    /// Replay an image file
    pub fn open(path: &Path) -> BackendResult<Self> {
        let frame = load_image_as_frame(path)?;
        Ok(Self::from_frame(path.display().to_string(), frame))
    }

    /// Replay an in-memory frame
    pub fn from_frame(name: impl Into<String>, frame: CameraFrame) -> Self {
        Self {
            name: name.into(),
            frame,
            interval: replay::FRAME_INTERVAL,
            worker: None,
        }
    }

    /// Override the frame interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl FrameSource for FileFrameSource {
    fn name(&self) -> String {
        format!("replay:{}", self.name)
    }

    fn start(&mut self, sink: FrameSink) -> BackendResult<()> {
        if self.worker.is_some() {
            return Err(BackendError::AlreadyRunning);
        }

        info!(source = %self.name, interval_ms = self.interval.as_millis(), "Starting replay");

        let template = self.frame.clone();
        let interval = self.interval;
        self.worker = Some(WorkerController::start("replay-source", move || {
            std::thread::sleep(interval);
            let mut frame = template.clone();
            frame.captured_at = Instant::now();
            match sink.deliver(Some(frame)) {
                Delivery::Closed => LoopAction::Stop,
                _ => LoopAction::Continue,
            }
        }));

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            info!(source = %self.name, "Replay stopped");
        }
    }
}

impl Drop for FileFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{FrameBudget, LatestFrameSlot, PreviewHandle, SlotTake};
    use std::sync::Arc;

    #[test]
    fn test_rejects_unknown_extension() {
        let result = load_image_as_frame(Path::new("clip.mp4"));
        assert!(matches!(result, Err(BackendError::Other(_))));
    }

    #[test]
    fn test_replay_delivers_until_stopped() {
        let frame = CameraFrame::packed(2, 1, PixelFormat::Gray8, vec![0u8, 255]);
        let mut source = FileFrameSource::from_frame("test", frame)
            .with_interval(Duration::from_millis(1));

        let slot = LatestFrameSlot::new();
        let sink = FrameSink::new(
            Arc::clone(&slot),
            FrameBudget::new(4),
            PreviewHandle::default(),
        );
        source.start(sink.clone()).unwrap();
        assert!(matches!(source.start(sink), Err(BackendError::AlreadyRunning)));

        match slot.take_timeout(Duration::from_secs(2)) {
            SlotTake::Frame(frame) => {
                assert_eq!(frame.image().map(|i| i.width), Some(2));
            }
            other => panic!("expected a replayed frame, got {:?}", other),
        }

        source.stop();
    }
}
