// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoding task
//!
//! Implements [`BarcodeDecoder`] with the rqrr crate. Camera frames are
//! converted to luma and downscaled before the grid search; picked images
//! are decoded at their full resolution.

use crate::app::frame_processor::decoder::{BarcodeDecoder, DecodeImage};
use crate::app::frame_processor::types::Symbol;
use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::constants::decoder::DEFAULT_MAX_DIMENSION;
use crate::errors::DecodeError;
use futures::FutureExt;
use futures::future::BoxFuture;
use image::GrayImage;
use tracing::{debug, trace};

/// QR code decoder
///
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone)]
pub struct QrDecoder {
    /// Maximum dimension for frame processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self {
            // QR codes are typically large enough to be found at this resolution
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Create a QR decoder with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }
}

impl BarcodeDecoder for QrDecoder {
    fn decode(&self, image: DecodeImage) -> BoxFuture<'static, Result<Vec<Symbol>, DecodeError>> {
        let max_dim = self.max_dimension;

        // Run decoding in a blocking task to avoid blocking the async runtime
        async move {
            tokio::task::spawn_blocking(move || decode_sync(image, max_dim))
                .await
                .map_err(|e| DecodeError::Worker(e.to_string()))?
        }
        .boxed()
    }
}

/// Synchronous QR decoding (runs in blocking task)
fn decode_sync(image: DecodeImage, max_dimension: u32) -> Result<Vec<Symbol>, DecodeError> {
    let start = std::time::Instant::now();

    let luma = match image {
        DecodeImage::Frame(frame) => frame_to_luma(&frame, max_dimension)?,
        DecodeImage::Luma(img) => img,
    };

    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidImage("image has no pixels".to_string()));
    }

    let conversion_time = start.elapsed();
    trace!(
        width,
        height,
        conversion_ms = conversion_time.as_millis(),
        "Prepared luma image for decoding"
    );

    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            luma.get_pixel(x as u32, y as u32).0[0]
        });
    let grids = prepared.detect_grids();

    // A grid that was located but could not be read still counts as a symbol
    let symbols: Vec<Symbol> = grids
        .iter()
        .map(|grid| match grid.decode() {
            Ok((_meta, content)) => {
                debug!(content = %content, "Decoded QR code");
                Symbol::qr(Some(content))
            }
            Err(e) => {
                debug!(error = ?e, "Failed to decode QR grid");
                Symbol::qr(None)
            }
        })
        .collect();

    if !symbols.is_empty() {
        debug!(
            count = symbols.len(),
            total_ms = start.elapsed().as_millis(),
            "QR decoding found symbols"
        );
    }

    Ok(symbols)
}

/// Convert a camera frame to luma, downscaling so neither side exceeds `max_dimension`
fn frame_to_luma(frame: &CameraFrame, max_dimension: u32) -> Result<GrayImage, DecodeError> {
    if !frame.is_complete() {
        return Err(DecodeError::InvalidImage(format!(
            "{}x{} frame with stride {} has only {} bytes",
            frame.width,
            frame.height,
            frame.stride,
            frame.data.len()
        )));
    }

    let width = frame.width;
    let height = frame.height;

    if width <= max_dimension && height <= max_dimension {
        return Ok(GrayImage::from_fn(width, height, |x, y| {
            image::Luma([luma_at(frame, x as usize, y as usize)])
        }));
    }

    let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
    let dst_width = ((width as f32 / scale) as u32).max(1);
    let dst_height = ((height as f32 / scale) as u32).max(1);
    Ok(downscale_luma(frame, dst_width, dst_height))
}

/// BT.601 luma of one pixel, accounting for stride
fn luma_at(frame: &CameraFrame, x: usize, y: usize) -> u8 {
    let bpp = frame.format.bytes_per_pixel() as usize;
    let offset = y * frame.stride as usize + x * bpp;
    let data = &frame.data;

    match frame.format {
        PixelFormat::Gray8 => data.get(offset).copied().unwrap_or(0),
        PixelFormat::RGBA | PixelFormat::RGB24 => {
            let (Some(&r), Some(&g), Some(&b)) =
                (data.get(offset), data.get(offset + 1), data.get(offset + 2))
            else {
                return 0;
            };
            ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
        }
    }
}

/// Downscale to luma using bilinear interpolation
fn downscale_luma(frame: &CameraFrame, dst_width: u32, dst_height: u32) -> GrayImage {
    let src_width = frame.width as usize;
    let src_height = frame.height as usize;

    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    GrayImage::from_fn(dst_width, dst_height, |x, y| {
        let src_x = x as f32 * x_ratio;
        let src_y = y as f32 * y_ratio;

        let x0 = src_x as usize;
        let y0 = src_y as usize;
        let x1 = (x0 + 1).min(src_width - 1);
        let y1 = (y0 + 1).min(src_height - 1);

        let x_frac = src_x - x0 as f32;
        let y_frac = src_y - y0 as f32;

        let p00 = luma_at(frame, x0, y0) as f32;
        let p01 = luma_at(frame, x1, y0) as f32;
        let p10 = luma_at(frame, x0, y1) as f32;
        let p11 = luma_at(frame, x1, y1) as f32;

        let value = p00 * (1.0 - x_frac) * (1.0 - y_frac)
            + p01 * x_frac * (1.0 - y_frac)
            + p10 * (1.0 - x_frac) * y_frac
            + p11 * x_frac * y_frac;

        image::Luma([value as u8])
    })
}
