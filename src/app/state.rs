// SPDX-License-Identifier: GPL-3.0-only

//! Application state management
//!
//! The screen machine and everything the UI shows live in [`AppState`].
//! [`reduce`] is the only way to change it: it takes the current state and
//! one [`Message`] and returns the next state plus the side effects the
//! shell has to perform.

use crate::app::gallery::GalleryOutcome;
use crate::app::notification::NotificationSlot;
use crate::config::{Config, ScannedValuePolicy};
use crate::constants::{messages, ui};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Identifies one camera binding; detections carry the id they were made under
pub type SessionId = u64;

/// Identifies one gallery pick attempt
pub type AttemptId = u64;

/// Screen currently shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Screen {
    #[default]
    Home,
    Camera,
    Gallery,
}

/// Navigation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    OpenCamera,
    OpenGallery,
    Back,
}

impl Screen {
    /// Next screen for `event`; unknown combinations leave the screen unchanged
    pub fn transition(self, event: NavEvent) -> Screen {
        match (self, event) {
            (Screen::Home, NavEvent::OpenCamera) => Screen::Camera,
            (Screen::Home, NavEvent::OpenGallery) => Screen::Gallery,
            (Screen::Camera | Screen::Gallery, NavEvent::Back) => Screen::Home,
            (screen, _) => screen,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Home => "Barcode Scanner",
            Screen::Camera => "Camera",
            Screen::Gallery => "Gallery",
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Navigate(NavEvent),
    /// A camera frame decoded to `value`
    Detected { session: SessionId, value: String },
    /// A gallery pick attempt settled
    GalleryFinished {
        attempt: AttemptId,
        outcome: GalleryOutcome,
    },
    /// The camera of `session` could not be started
    CameraFailed { session: SessionId, reason: String },
    /// Periodic clock tick from the shell
    Tick,
    Quit,
}

/// Side effects requested by [`reduce`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Bind the camera and tag its detections with `session`
    StartCamera { session: SessionId },
    /// Unbind the camera
    StopCamera,
    /// Show the image picker and report back with `attempt`
    LaunchPicker { attempt: AttemptId },
    Quit,
}

/// Part of the configuration the reducer depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub scanned_value_policy: ScannedValuePolicy,
    pub notification_lifetime: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scanned_value_policy: ScannedValuePolicy::default(),
            notification_lifetime: Duration::from_secs(ui::NOTIFICATION_SECS),
        }
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            scanned_value_policy: config.scanned_value_policy,
            notification_lifetime: config.notification_duration(),
        }
    }
}

/// Everything the UI renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub screen: Screen,
    /// Last decoded value; a new detection replaces it
    pub scanned_value: Option<String>,
    pub notification: NotificationSlot,
    /// Live camera binding, set only while on the camera screen
    pub camera_session: Option<SessionId>,
    /// Pick attempt waiting for its outcome
    pub pending_pick: Option<AttemptId>,
    next_id: u64,
}

impl AppState {
    /// Text for the value label
    pub fn scanned_label(&self) -> String {
        match self.scanned_value.as_deref() {
            Some(value) if !value.is_empty() => format!("{}{}", ui::SCANNED_PREFIX, value),
            _ => ui::PLACEHOLDER.to_string(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Apply one message
pub fn reduce(
    mut state: AppState,
    message: Message,
    settings: &Settings,
    now: Instant,
) -> (AppState, Vec<Effect>) {
    let mut effects = Vec::new();

    match message {
        Message::Navigate(event) => {
            let from = state.screen;
            let to = from.transition(event);
            if from == to {
                debug!(screen = ?from, event = ?event, "Navigation event ignored");
                return (state, effects);
            }

            // Leaving
            match from {
                Screen::Camera => {
                    state.camera_session = None;
                    effects.push(Effect::StopCamera);
                }
                Screen::Gallery => {
                    // An outcome still in flight is stale from now on
                    state.pending_pick = None;
                }
                Screen::Home => {}
            }

            state.screen = to;
            info!(from = ?from, to = ?to, "Screen changed");

            // Entering
            match to {
                Screen::Home => {
                    if settings.scanned_value_policy == ScannedValuePolicy::ResetOnHome {
                        state.scanned_value = None;
                    }
                }
                Screen::Camera => {
                    let session = state.allocate_id();
                    state.camera_session = Some(session);
                    effects.push(Effect::StartCamera { session });
                }
                Screen::Gallery => {
                    let attempt = state.allocate_id();
                    state.pending_pick = Some(attempt);
                    effects.push(Effect::LaunchPicker { attempt });
                }
            }
        }

        Message::Detected { session, value } => {
            if state.screen == Screen::Camera && state.camera_session == Some(session) {
                state.scanned_value = Some(value);
            } else {
                debug!(session, "Discarding detection from stale camera session");
            }
        }

        Message::GalleryFinished { attempt, outcome } => {
            if state.screen != Screen::Gallery || state.pending_pick != Some(attempt) {
                debug!(attempt, outcome = ?outcome, "Discarding stale gallery outcome");
                return (state, effects);
            }
            state.pending_pick = None;

            if let Some(text) = outcome.notification_text() {
                state
                    .notification
                    .post(text, now, settings.notification_lifetime);
            }
            if let GalleryOutcome::Detected(value) = outcome {
                state.scanned_value = Some(value);
            }
        }

        Message::CameraFailed { session, reason } => {
            error!(session, error = %reason, "Camera unavailable");
            if state.screen == Screen::Camera && state.camera_session == Some(session) {
                state.camera_session = None;
                state.notification.post(
                    format!("{}{}", messages::ERROR_PREFIX, reason),
                    now,
                    settings.notification_lifetime,
                );
            }
        }

        Message::Tick => {
            state.notification.expire(now);
        }

        Message::Quit => {
            if state.camera_session.take().is_some() {
                effects.push(Effect::StopCamera);
            }
            effects.push(Effect::Quit);
        }
    }

    (state, effects)
}
