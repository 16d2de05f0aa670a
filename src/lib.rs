// SPDX-License-Identifier: MPL-2.0

//! Barcode Scanner - scan barcodes from a live camera or an image file
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Screen machine, frame analyzer, gallery flow and controller
//! - [`backends`]: Camera frame sources and image pickers
//! - [`config`]: User configuration handling
//! - [`terminal`]: Interactive terminal shell
//!
//! # Example
//!
//! ```ignore
//! // Interactive scanner:
//! // barcode-scanner
//! // Decode a file:
//! // barcode-scanner scan code.png
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod terminal;

// Re-export commonly used types
pub use app::frame_processor::{BarcodeDecoder, FrameAnalyzer, QrDecoder, Symbol};
pub use app::{AppState, GalleryOutcome, Message, NavEvent, ScannerApp, Screen};
pub use config::{Config, ScannedValuePolicy};
pub use errors::{AppError, AppResult};
