// SPDX-License-Identifier: MPL-2.0

//! Camera operation logic (binding and unbinding the scanner camera)

use crate::app::ScannerApp;
use crate::app::frame_processor::{BarcodeDecoder, DetectionCallback, FrameAnalyzer};
use crate::app::state::{Message, SessionId};
use crate::backends::camera::types::{BackendResult, CameraFrame};
use crate::backends::camera::{CameraSession, FrameBudget, SharedSource};
use futures::channel::mpsc::UnboundedSender;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info};

/// A camera session with an analyzer attached
///
/// Detections are tagged with the session id so results that arrive after
/// the session ended can be recognized as stale.
pub struct ScanSession {
    id: SessionId,
    analyzer: Arc<FrameAnalyzer>,
    camera: CameraSession,
}

impl ScanSession {
    /// Bind `source` and decode every delivered frame with `decoder`
    pub fn start(
        id: SessionId,
        source: SharedSource,
        decoder: Arc<dyn BarcodeDecoder>,
        runtime: Handle,
        on_detected: DetectionCallback,
    ) -> BackendResult<Self> {
        let analyzer = Arc::new(FrameAnalyzer::new(decoder, runtime, on_detected));

        let worker_analyzer = Arc::clone(&analyzer);
        let camera = CameraSession::start(source, move |frame| {
            // Task handles are not awaited; the task releases the frame itself
            let _ = worker_analyzer.analyze(frame);
        })?;

        info!(session = id, "Scan session started");
        Ok(Self {
            id,
            analyzer,
            camera,
        })
    }

    /// Newest captured image, for the preview
    pub fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        self.camera.preview().latest()
    }

    pub fn budget(&self) -> &Arc<FrameBudget> {
        self.camera.budget()
    }

    pub fn is_running(&self) -> bool {
        self.camera.is_running()
    }

    /// Stop delivery and discard the results of decodes still in flight
    pub fn stop(self) {
        self.analyzer.deactivate();
        self.camera.stop();
        info!(session = self.id, "Scan session stopped");
    }
}

/// Detection callback that forwards values to the UI context as [`Message::Detected`]
pub fn detection_forwarder(sender: UnboundedSender<Message>, session: SessionId) -> DetectionCallback {
    Arc::new(move |value| {
        if sender
            .unbounded_send(Message::Detected { session, value })
            .is_err()
        {
            debug!(session, "UI context gone, dropping detection");
        }
    })
}

impl ScannerApp {
    /// Bind the camera for `session`, replacing any previous binding
    pub(crate) fn start_camera(&mut self, session: SessionId) {
        self.stop_camera();

        let on_detected = detection_forwarder(self.sender.clone(), session);
        match ScanSession::start(
            session,
            Arc::clone(&self.services.source),
            Arc::clone(&self.services.decoder),
            self.services.runtime.clone(),
            on_detected,
        ) {
            Ok(scan) => self.scan = Some(scan),
            Err(e) => {
                error!(session, error = %e, "Failed to start camera");
                // Routed through the queue so the reducer sees it like any other event
                let _ = self.sender.unbounded_send(Message::CameraFailed {
                    session,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Unbind the camera if it is bound
    pub(crate) fn stop_camera(&mut self) {
        if let Some(scan) = self.scan.take() {
            scan.stop();
        }
    }
}
