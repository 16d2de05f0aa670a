// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON under the platform config directory. A missing file yields
//! the defaults; an unreadable one is logged and also yields the defaults.

use crate::constants::{APP_ID, decoder, ui};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happens to the displayed value when navigating back to Home
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum ScannedValuePolicy {
    /// The value is cleared every time Home is shown again
    #[default]
    ResetOnHome,
    /// The value survives Home round trips until a new scan replaces it
    Retain,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera index from `list` (None = let GStreamer pick a source)
    pub camera_device: Option<usize>,
    /// Frames are downscaled to this before decoding
    pub max_dimension: u32,
    /// Lifetime of a transient notification in seconds
    pub notification_secs: u64,
    /// Whether the scanned value survives returning to Home
    pub scanned_value_policy: ScannedValuePolicy,
    /// Mirror camera preview horizontally (selfie mode)
    pub mirror_preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_device: None,
            max_dimension: decoder::DEFAULT_MAX_DIMENSION,
            notification_secs: ui::NOTIFICATION_SECS,
            scanned_value_policy: ScannedValuePolicy::default(),
            mirror_preview: false,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join("config.json"))
    }

    /// Load from the default location
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory on this platform, using defaults");
                Self::default()
            }
        }
    }

    /// Load from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    /// Save to a specific file, creating its directory
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Config(e.to_string()))?;
        }
        let contents =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, contents).map_err(|e| AppError::Config(e.to_string()))?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("No config directory available".to_string()))?;
        self.save_to(&path)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }
}
