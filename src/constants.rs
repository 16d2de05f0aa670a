// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application identifier used for config, cache and log paths
pub const APP_ID: &str = "barcode-scanner";

/// Camera frame delivery constants
pub mod camera {
    use super::Duration;

    /// Frames a source may hand out before it must see one released
    ///
    /// One pending in the keep-latest slot plus a few decodes in flight.
    pub const MAX_OUTSTANDING_FRAMES: usize = 4;

    /// How long the analysis worker waits on an empty slot before
    /// re-checking its stop signal
    pub const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Name of the analysis worker thread (for logging)
    pub const WORKER_NAME: &str = "frame-analyzer";
}

/// GStreamer pipeline constants
pub mod pipeline {
    /// Appsink keeps only the newest buffer and drops older ones
    pub const MAX_BUFFERS: u32 = 1;

    /// Output pixel format for appsink
    pub const OUTPUT_FORMAT: &str = "RGBA";

    /// Device class used when enumerating cameras
    pub const VIDEO_SOURCE_CLASS: &str = "Video/Source";
}

/// Pipeline timing constants
pub mod timing {
    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Pipeline playing state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;
}

/// Decoder constants
pub mod decoder {
    /// Frames larger than this (in either dimension) are downscaled before decoding
    pub const DEFAULT_MAX_DIMENSION: u32 = 640;
}

/// Replay source constants
pub mod replay {
    use super::Duration;

    /// Frame interval when streaming a still image (~30fps)
    pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);
}

/// Terminal UI constants
pub mod ui {
    use super::Duration;

    /// Input poll timeout, also the redraw interval
    pub const POLL_INTERVAL: Duration = Duration::from_millis(16);

    /// Default lifetime of a transient notification (a short toast)
    pub const NOTIFICATION_SECS: u64 = 2;

    /// Label shown before anything was scanned
    pub const PLACEHOLDER: &str = "Scan a barcode...";

    /// Prefix of the label shown once a value was scanned
    pub const SCANNED_PREFIX: &str = "Scanned: ";
}

/// Supported file formats for the image picker
pub mod file_formats {
    /// Mime pattern requested from the picker
    pub const IMAGE_MIME: &str = "image/*";

    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Text of the transient notifications raised by the gallery flow
pub mod messages {
    /// Decoder returned no symbols for a picked image
    pub const NO_BARCODE_FOUND: &str = "No barcode found";

    /// Prefix for decoder failures
    pub const FAILED_PREFIX: &str = "Failed: ";

    /// Prefix for image construction and camera failures
    pub const ERROR_PREFIX: &str = "Error: ";
}
