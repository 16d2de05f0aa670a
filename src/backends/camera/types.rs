// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera backends

use std::sync::Arc;
use std::time::Instant;

/// Frame data storage
///
/// Shared so the preview and the decoder can hold the same buffer without copying.
pub type FrameData = Arc<[u8]>;

/// Pixel layouts a frame source can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4 bytes per pixel, R G B A
    RGBA,
    /// 3 bytes per pixel, R G B
    RGB24,
    /// 1 byte per pixel, luma only
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::RGBA => 4,
            PixelFormat::RGB24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// One captured image buffer
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: FrameData,
    pub format: PixelFormat,
    /// Row stride (bytes per row, may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed frame (stride = width * bytes per pixel)
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: impl Into<FrameData>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            format,
            stride: width * format.bytes_per_pixel(),
            captured_at: Instant::now(),
        }
    }

    /// Whether the buffer is large enough for the declared geometry
    pub fn is_complete(&self) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        let row_bytes = (self.width * self.format.bytes_per_pixel()) as usize;
        let needed = (self.height as usize - 1) * self.stride as usize + row_bytes;
        self.stride as usize >= row_bytes && self.data.len() >= needed
    }

    /// Sample one pixel as RGB, clamping coordinates to the frame
    pub fn sample_rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let bpp = self.format.bytes_per_pixel();
        let idx = (y * self.stride + x * bpp) as usize;

        match self.format {
            PixelFormat::RGBA | PixelFormat::RGB24 => {
                if idx + 2 < self.data.len() {
                    (self.data[idx], self.data[idx + 1], self.data[idx + 2])
                } else {
                    (0, 0, 0)
                }
            }
            PixelFormat::Gray8 => match self.data.get(idx) {
                Some(&v) => (v, v, v),
                None => (0, 0, 0),
            },
        }
    }
}

/// A camera the GStreamer device monitor reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Index in enumeration order (what `--device` refers to)
    pub index: usize,
    /// Human readable name
    pub name: String,
    /// Device path if the provider exposes one (e.g. /dev/video0)
    pub path: Option<String>,
}

impl std::fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {} ({})", self.index, self.name, path),
            None => write!(f, "[{}] {}", self.index, self.name),
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors from frame sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Source was started twice without a stop in between
    AlreadyRunning,
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::AlreadyRunning => write!(f, "Frame source already running"),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}
