// SPDX-License-Identifier: GPL-3.0-only

//! Transient notifications
//!
//! A single auto-dismissing text slot. Posting replaces whatever is shown.

use std::time::{Duration, Instant};

/// A short message shown for a limited time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub expires_at: Instant,
}

impl Notification {
    pub fn new(text: impl Into<String>, now: Instant, lifetime: Duration) -> Self {
        Self {
            text: text.into(),
            expires_at: now + lifetime,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Holds at most one notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationSlot {
    current: Option<Notification>,
    posted: u64,
}

impl NotificationSlot {
    /// Show `text` until `now + lifetime`, replacing the current notification
    pub fn post(&mut self, text: impl Into<String>, now: Instant, lifetime: Duration) {
        self.current = Some(Notification::new(text, now, lifetime));
        self.posted += 1;
    }

    /// Drop the notification once its lifetime has elapsed
    ///
    /// Returns true when something was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.current.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.current = None;
            return true;
        }
        false
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        self.current.as_ref().map(|n| n.text.as_str())
    }

    /// Number of notifications posted since creation
    pub fn posted(&self) -> u64 {
        self.posted
    }
}
