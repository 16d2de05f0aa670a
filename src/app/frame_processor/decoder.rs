// SPDX-License-Identifier: GPL-3.0-only

//! Decoder abstraction
//!
//! A decoder is stateless: it takes one image and resolves, some time
//! later, to the symbols it found or to a failure.

use super::types::Symbol;
use crate::backends::camera::types::CameraFrame;
use crate::errors::DecodeError;
use futures::future::BoxFuture;
use image::GrayImage;
use std::sync::Arc;

/// Image submitted for decoding
#[derive(Debug, Clone)]
pub enum DecodeImage {
    /// A live camera frame (any supported pixel layout, possibly strided)
    Frame(Arc<CameraFrame>),
    /// A luma image, e.g. built from a picked file
    Luma(GrayImage),
}

/// Asynchronous barcode decoding service
pub trait BarcodeDecoder: Send + Sync {
    /// Decode one image
    ///
    /// The returned future owns everything it needs, so it can be spawned
    /// and outlive the caller.
    fn decode(&self, image: DecodeImage) -> BoxFuture<'static, Result<Vec<Symbol>, DecodeError>>;
}
