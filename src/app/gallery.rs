// SPDX-License-Identifier: GPL-3.0-only

//! Gallery decode flow
//!
//! One pass of: ask the picker for an image, build a luma image from it,
//! decode it. Every outcome maps to at most one notification.

use crate::app::frame_processor::{BarcodeDecoder, DecodeImage, first_payload};
use crate::backends::picker::{ImagePicker, MimeFilter, PickedImage};
use crate::constants::messages;
use crate::errors::ImageError;
use image::GrayImage;
use tracing::{debug, error, info, warn};

/// Result of one gallery pick attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryOutcome {
    /// The user closed the picker without choosing
    Cancelled,
    /// First payload of the decoded symbols
    Detected(String),
    /// The decoder found no symbols at all
    NoBarcode,
    /// Symbols were found but none carried a payload
    NoPayload,
    /// The decoder failed
    DecodeFailed(String),
    /// The picked image could not be loaded
    ImageError(String),
}

impl GalleryOutcome {
    /// Text of the notification this outcome posts, if any
    pub fn notification_text(&self) -> Option<String> {
        match self {
            GalleryOutcome::NoBarcode => Some(messages::NO_BARCODE_FOUND.to_string()),
            GalleryOutcome::DecodeFailed(msg) => Some(format!("{}{}", messages::FAILED_PREFIX, msg)),
            GalleryOutcome::ImageError(msg) => Some(format!("{}{}", messages::ERROR_PREFIX, msg)),
            GalleryOutcome::Cancelled | GalleryOutcome::Detected(_) | GalleryOutcome::NoPayload => {
                None
            }
        }
    }

    pub fn detected_value(&self) -> Option<&str> {
        match self {
            GalleryOutcome::Detected(value) => Some(value),
            _ => None,
        }
    }
}

/// Build a luma image from a picked file or buffer
pub fn load_picked_image(picked: &PickedImage) -> Result<GrayImage, ImageError> {
    let img = match picked {
        PickedImage::Path(path) => image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?,
        PickedImage::Bytes(bytes) => image::load_from_memory(bytes)?,
    };

    let luma = img.to_luma8();
    if luma.width() == 0 || luma.height() == 0 {
        return Err(ImageError::Empty);
    }
    Ok(luma)
}

/// Load a picked image on the blocking pool
///
/// Full-size photos take long enough to decode that they must not run on a
/// runtime worker.
pub async fn load_in_background(picked: PickedImage) -> Result<GrayImage, ImageError> {
    tokio::task::spawn_blocking(move || load_picked_image(&picked))
        .await
        .map_err(|e| ImageError::Unreadable(e.to_string()))?
}

/// Run one pick-and-decode attempt
pub async fn run_gallery_flow(
    picker: &dyn ImagePicker,
    decoder: &dyn BarcodeDecoder,
) -> GalleryOutcome {
    let Some(picked) = picker.pick(MimeFilter::IMAGES).await else {
        debug!("Gallery pick cancelled");
        return GalleryOutcome::Cancelled;
    };

    // The pick is only needed for this attempt, so it moves into the loader
    let description = picked.describe();
    let luma = match load_in_background(picked).await {
        Ok(luma) => luma,
        Err(e) => {
            error!(image = %description, error = %e, "Failed to load picked image");
            return GalleryOutcome::ImageError(e.to_string());
        }
    };
    debug!(
        image = %description,
        width = luma.width(),
        height = luma.height(),
        "Decoding picked image"
    );

    match decoder.decode(DecodeImage::Luma(luma)).await {
        Ok(symbols) if symbols.is_empty() => {
            info!("No barcode in picked image");
            GalleryOutcome::NoBarcode
        }
        Ok(symbols) => match first_payload(&symbols) {
            Some(value) => {
                info!(payload = %value, "Barcode decoded from picked image");
                GalleryOutcome::Detected(value.to_string())
            }
            None => {
                debug!(count = symbols.len(), "Symbols without payload in picked image");
                GalleryOutcome::NoPayload
            }
        },
        Err(e) => {
            warn!(error = %e, "Decoding picked image failed");
            GalleryOutcome::DecodeFailed(e.to_string())
        }
    }
}
