// SPDX-License-Identifier: MPL-2.0

//! Frame processing
//!
//! Camera frames and picked images go through a [`BarcodeDecoder`]; the
//! [`FrameAnalyzer`] relays live frames and reports the first payload of
//! each decode.

pub mod analyzer;
pub mod decoder;
pub mod tasks;
pub mod types;

pub use analyzer::{DetectionCallback, FrameAnalyzer};
pub use decoder::{BarcodeDecoder, DecodeImage};
pub use tasks::QrDecoder;
pub use types::{Symbol, SymbolFormat, first_payload};
