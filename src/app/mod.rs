// SPDX-License-Identifier: MPL-2.0

//! Main application module for the barcode scanner
//!
//! # Architecture
//!
//! - `state`: Screen machine, messages and the pure [`reduce`] function
//! - `frame_processor`: Decoder abstraction, rqrr decoder and frame analyzer
//! - `gallery`: Pick-and-decode flow for image files
//! - `notification`: Transient toast model
//! - `camera_ops`: Binding the camera to the analyzer
//!
//! # Main Types
//!
//! - [`ScannerApp`]: Owns the state and performs the effects the reducer asks for
//! - [`Message`]: Everything that can happen to the application

mod camera_ops;
pub mod frame_processor;
pub mod gallery;
pub mod notification;
pub mod state;

pub use camera_ops::{ScanSession, detection_forwarder};
pub use gallery::{GalleryOutcome, run_gallery_flow};
pub use state::{AppState, AttemptId, Effect, Message, NavEvent, Screen, SessionId, Settings, reduce};

use crate::app::frame_processor::BarcodeDecoder;
use crate::backends::camera::SharedSource;
use crate::backends::camera::types::CameraFrame;
use crate::backends::picker::ImagePicker;
use crate::config::Config;
use futures::channel::mpsc::UnboundedSender;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// External capabilities the application drives
#[derive(Clone)]
pub struct Services {
    /// Camera frames; bound while the camera screen is shown
    pub source: SharedSource,
    pub decoder: Arc<dyn BarcodeDecoder>,
    pub picker: Arc<dyn ImagePicker>,
    /// Runtime for decodes and pick attempts
    pub runtime: Handle,
}

/// Application controller
///
/// Lives on the UI context. Other threads reach it only by sending
/// [`Message`]s through the channel whose sender it was given.
pub struct ScannerApp {
    state: AppState,
    settings: Settings,
    services: Services,
    sender: UnboundedSender<Message>,
    scan: Option<ScanSession>,
}

impl ScannerApp {
    pub fn new(config: &Config, services: Services, sender: UnboundedSender<Message>) -> Self {
        Self {
            state: AppState::default(),
            settings: Settings::from(config),
            services,
            sender,
            scan: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The live camera binding, if any
    pub fn scan_session(&self) -> Option<&ScanSession> {
        self.scan.as_ref()
    }

    /// Newest camera image for the preview
    pub fn preview(&self) -> Option<Arc<CameraFrame>> {
        self.scan.as_ref().and_then(ScanSession::latest_frame)
    }

    /// Apply a message at the current time
    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        self.update_at(message, Instant::now())
    }

    /// Apply a message and perform the camera and picker effects it produces
    ///
    /// The returned effects are informational except for [`Effect::Quit`],
    /// which the shell has to honour.
    pub fn update_at(&mut self, message: Message, now: Instant) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = reduce(state, message, &self.settings, now);
        self.state = state;

        for effect in &effects {
            match *effect {
                Effect::StartCamera { session } => self.start_camera(session),
                Effect::StopCamera => self.stop_camera(),
                Effect::LaunchPicker { attempt } => self.launch_picker(attempt),
                Effect::Quit => {
                    debug!("Quit requested");
                }
            }
        }

        effects
    }

    /// Release the camera; called by the shell before exiting
    pub fn shutdown(&mut self) {
        self.stop_camera();
        info!("Scanner shut down");
    }

    fn launch_picker(&mut self, attempt: AttemptId) {
        let picker = Arc::clone(&self.services.picker);
        let decoder = Arc::clone(&self.services.decoder);
        let sender = self.sender.clone();

        self.services.runtime.spawn(async move {
            let outcome = run_gallery_flow(picker.as_ref(), decoder.as_ref()).await;
            if sender
                .unbounded_send(Message::GalleryFinished { attempt, outcome })
                .is_err()
            {
                debug!(attempt, "UI context gone, dropping gallery outcome");
            }
        });
    }
}

impl Drop for ScannerApp {
    fn drop(&mut self) {
        self.stop_camera();
    }
}
