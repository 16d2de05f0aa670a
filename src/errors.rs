// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner application

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors
    Camera(BackendError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Errors reported by a barcode decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The image has no pixels or inconsistent dimensions
    InvalidImage(String),
    /// The blocking decode task failed (panicked or was cancelled)
    Worker(String),
}

/// Errors while building a decodable image from a picked image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// The file or buffer could not be read or parsed
    Unreadable(String),
    /// The image decoded to zero pixels
    Empty,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            DecodeError::Worker(msg) => write!(f, "Decoder task failed: {}", msg),
        }
    }
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Unreadable(msg) => write!(f, "{}", msg),
            ImageError::Empty => write!(f, "Image has no pixels"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for DecodeError {}
impl std::error::Error for ImageError {}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Camera(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::Unreadable(err.to_string())
    }
}

impl From<std::io::Error> for ImageError {
    fn from(err: std::io::Error) -> Self {
        ImageError::Unreadable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_error_message_is_underlying_text() {
        let err = ImageError::Unreadable("bad header".to_string());
        assert_eq!(err.to_string(), "bad header");
    }

    #[test]
    fn test_app_error_wraps_camera_error() {
        let err: AppError = BackendError::DeviceNotFound("video0".to_string()).into();
        assert!(err.to_string().starts_with("Camera error: "));
        assert!(err.to_string().contains("video0"));
    }
}
