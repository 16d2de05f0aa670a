// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanning without the terminal UI
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Decoding a barcode from an image file
//! - Watching a camera (or a replayed image) for barcodes
//! - Showing and initializing the configuration file

use barcode_scanner::app::frame_processor::QrDecoder;
use barcode_scanner::app::{GalleryOutcome, Message, ScanSession, detection_forwarder, run_gallery_flow};
use barcode_scanner::backends::camera::{
    FileFrameSource, GstFrameSource, SharedSource, enumerate_cameras, shared_source,
};
use barcode_scanner::backends::picker::PathImagePicker;
use barcode_scanner::config::Config;
use chrono::Local;
use futures::StreamExt;
use futures::channel::mpsc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Session id used for the single headless camera binding
const WATCH_SESSION: u64 = 1;

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = enumerate_cameras()?;

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  {}", camera);
    }

    Ok(())
}

/// Decode the first barcode in an image file
pub fn scan_file(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let picker = PathImagePicker::new(path);
    let decoder = QrDecoder::with_max_dimension(config.max_dimension);

    let outcome = runtime.block_on(run_gallery_flow(&picker, &decoder));

    let value = scan_result(outcome)?;
    println!("{}", value);
    Ok(())
}

/// Map a gallery outcome to the decoded value or the error the command exits with
fn scan_result(outcome: GalleryOutcome) -> Result<String, String> {
    match outcome {
        GalleryOutcome::Detected(value) => Ok(value),
        GalleryOutcome::NoPayload => Err("Barcode found but it has no readable content".to_string()),
        GalleryOutcome::Cancelled => Err("No image selected".to_string()),
        other => Err(other
            .notification_text()
            .unwrap_or_else(|| format!("{:?}", other))),
    }
}

/// Options of the `watch` command
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Camera index; falls back to the configured device
    pub device: Option<usize>,
    /// Replay this image instead of opening a camera
    pub replay: Option<PathBuf>,
    /// Give up after this many seconds
    pub timeout: Option<u64>,
    /// Keep printing detections instead of exiting after the first
    pub continuous: bool,
}

/// Print barcodes seen by a camera
pub fn watch(options: WatchOptions, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let source: SharedSource = match &options.replay {
        Some(path) => {
            println!("Replaying: {}", path.display());
            shared_source(FileFrameSource::open(path)?)
        }
        None => {
            let device = options.device.or(config.camera_device);
            match device {
                Some(index) => println!("Using camera: {}", index),
                None => println!("Using default camera"),
            }
            shared_source(GstFrameSource::new(device))
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let (sender, receiver) = mpsc::unbounded();

    let session = ScanSession::start(
        WATCH_SESSION,
        source,
        Arc::new(QrDecoder::with_max_dimension(config.max_dimension)),
        runtime.handle().clone(),
        detection_forwarder(sender, WATCH_SESSION),
    )?;

    println!("Watching for barcodes...");
    let timeout = options.timeout.map(Duration::from_secs);
    let detections = runtime.block_on(collect_detections(
        receiver,
        timeout,
        options.continuous,
        |value| println!("[{}] {}", Local::now().format("%H:%M:%S"), value),
    ));

    session.stop();
    runtime.shutdown_background();

    if detections == 0 {
        return Err("No barcode detected".into());
    }
    Ok(())
}

/// Receive detections until the first one (or, when `continuous`, until
/// the timeout or the channel closes), passing each new value to `emit`
///
/// Consecutive repeats are skipped since every frame of a still code decodes
/// to the same value. Returns how many values were emitted.
async fn collect_detections(
    mut receiver: mpsc::UnboundedReceiver<Message>,
    timeout: Option<Duration>,
    continuous: bool,
    mut emit: impl FnMut(&str),
) -> usize {
    let deadline = timeout.map(|timeout| tokio::time::Instant::now() + timeout);
    let mut count = 0usize;
    let mut last: Option<String> = None;

    loop {
        let next = receiver.next();
        let message = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, next).await {
                Ok(message) => message,
                Err(_) => break,
            },
            None => next.await,
        };

        let value = match message {
            Some(Message::Detected { value, .. }) => value,
            Some(_) => continue,
            None => break,
        };

        if last.as_deref() == Some(value.as_str()) {
            continue;
        }
        emit(&value);
        last = Some(value);
        count += 1;

        if !continuous {
            break;
        }
    }

    count
}

/// Config file the commands read: `explicit` when given, else the default location
fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(Config::default_path)
}

/// Write the default configuration to `path` unless a file is already there
///
/// Returns whether a file was written.
fn init_config(path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    if path.exists() {
        return Ok(false);
    }
    Config::default().save_to(path)?;
    Ok(true)
}

/// Print the configuration, optionally writing the defaults to disk
pub fn show_config(init: bool, explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path(explicit);

    if init {
        let path = path.as_deref().ok_or("No config directory available")?;
        if init_config(path)? {
            println!("Wrote default config: {}", path.display());
        } else {
            println!("Config already exists: {}", path.display());
        }
    }

    let config = match &path {
        Some(path) => {
            println!("Config file: {}", path.display());
            Config::load_from(path)
        }
        None => {
            println!("Config file: <unavailable>");
            Config::default()
        }
    };
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
