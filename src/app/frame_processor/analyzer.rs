// SPDX-License-Identifier: GPL-3.0-only

//! Frame analyzer
//!
//! Relays camera frames to a [`BarcodeDecoder`] and reports at most one
//! decoded value per frame. Every frame is released exactly once, after its
//! decode has settled.

use super::decoder::{BarcodeDecoder, DecodeImage};
use super::types::first_payload;
use crate::backends::camera::Frame;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Receives decoded values; may be called from any runtime worker thread
pub type DetectionCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Submits frames for decoding and relays the first payload of each
pub struct FrameAnalyzer {
    decoder: Arc<dyn BarcodeDecoder>,
    on_detected: DetectionCallback,
    runtime: Handle,
    active: Arc<AtomicBool>,
}

impl FrameAnalyzer {
    /// Decodes run as tasks on `runtime`
    pub fn new(decoder: Arc<dyn BarcodeDecoder>, runtime: Handle, on_detected: DetectionCallback) -> Self {
        Self {
            decoder,
            on_detected,
            runtime,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Analyze one frame
    ///
    /// Returns the decode task, or `None` when the frame had no image and was
    /// released on the spot. Overlapping decodes are allowed; whichever
    /// settles last reports last.
    pub fn analyze(&self, frame: Frame) -> Option<JoinHandle<()>> {
        let Some(image) = frame.image().cloned() else {
            trace!(sequence = frame.sequence(), "Frame has no image buffer");
            frame.release();
            return None;
        };

        let sequence = frame.sequence();
        let decode = self.decoder.decode(DecodeImage::Frame(image));
        let on_detected = Arc::clone(&self.on_detected);
        let active = Arc::clone(&self.active);

        Some(self.runtime.spawn(async move {
            match decode.await {
                Ok(symbols) => match first_payload(&symbols) {
                    Some(payload) if active.load(Ordering::Acquire) => {
                        info!(sequence, payload = %payload, "Barcode detected");
                        on_detected(payload.to_string());
                    }
                    Some(_) => {
                        debug!(sequence, "Analyzer inactive, discarding detection");
                    }
                    None => {
                        trace!(sequence, count = symbols.len(), "No readable symbol in frame");
                    }
                },
                Err(e) => {
                    warn!(sequence, error = %e, "Barcode decode failed");
                }
            }

            // Held until here so the buffer is never returned while in use
            frame.release();
        }))
    }

    /// Stop reporting results
    ///
    /// Decodes already in flight still settle and release their frames.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
