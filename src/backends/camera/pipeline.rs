// SPDX-License-Identifier: MPL-2.0

//! GStreamer camera source
//!
//! Builds `<source> ! videoconvert ! RGBA ! appsink` and hands every sample
//! to the session's [`FrameSink`]. The appsink keeps a single buffer and
//! drops older ones, so a slow consumer only ever sees the newest capture.

use super::FrameSource;
use super::delivery::{Delivery, FrameSink};
use super::types::{BackendError, BackendResult, CameraDevice, CameraFrame, PixelFormat};
use crate::constants::{pipeline as pipeline_consts, timing};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Enumerate video sources through the GStreamer device monitor
pub fn enumerate_cameras() -> BackendResult<Vec<CameraDevice>> {
    gstreamer::init().map_err(|e| BackendError::NotAvailable(e.to_string()))?;

    let monitor = gstreamer::DeviceMonitor::new();
    let _ = monitor.add_filter(Some(pipeline_consts::VIDEO_SOURCE_CLASS), None);
    monitor
        .start()
        .map_err(|e| BackendError::NotAvailable(format!("Device monitor failed: {}", e)))?;

    let cameras: Vec<CameraDevice> = monitor
        .devices()
        .iter()
        .enumerate()
        .map(|(index, device)| {
            let path = device.properties().and_then(|props| {
                props
                    .get::<String>("api.v4l2.path")
                    .or_else(|_| props.get::<String>("device.path"))
                    .ok()
            });
            CameraDevice {
                index,
                name: device.display_name().to_string(),
                path,
            }
        })
        .collect();

    monitor.stop();
    info!(count = cameras.len(), "Enumerated cameras");
    Ok(cameras)
}

/// Build the pipeline description for an optional device path
fn build_pipeline_string(device_path: Option<&str>) -> String {
    let source = match device_path {
        Some(path) => format!("v4l2src device={}", path),
        None => "autovideosrc".to_string(),
    };
    format!(
        "{} ! videoconvert ! video/x-raw,format={} ! \
         appsink name=sink max-buffers={} drop=true sync=false enable-last-sample=false",
        source,
        pipeline_consts::OUTPUT_FORMAT,
        pipeline_consts::MAX_BUFFERS
    )
}

fn pixel_format_of(format: gstreamer_video::VideoFormat) -> Option<PixelFormat> {
    match format {
        gstreamer_video::VideoFormat::Rgba => Some(PixelFormat::RGBA),
        gstreamer_video::VideoFormat::Rgb => Some(PixelFormat::RGB24),
        gstreamer_video::VideoFormat::Gray8 => Some(PixelFormat::Gray8),
        _ => None,
    }
}

/// Convert an appsink sample into a camera frame
///
/// Returns `None` when the sample carries no readable buffer; the frame is
/// still delivered so the analyzer can release it.
fn sample_to_frame(sample: &gstreamer::Sample, captured_at: Instant) -> Option<CameraFrame> {
    let buffer = sample.buffer()?;
    if buffer.flags().contains(gstreamer::BufferFlags::CORRUPTED) {
        return None;
    }
    let caps = sample.caps()?;
    let info = VideoInfo::from_caps(caps).ok()?;
    let format = pixel_format_of(info.format())?;
    let map = buffer.map_readable().ok()?;

    Some(CameraFrame {
        width: info.width(),
        height: info.height(),
        data: Arc::from(map.as_slice()),
        format,
        stride: info.stride()[0] as u32,
        captured_at,
    })
}

/// Camera source backed by a GStreamer pipeline
pub struct GstFrameSource {
    device: Option<usize>,
    running: Option<(gstreamer::Pipeline, AppSink)>,
}

impl GstFrameSource {
    /// `device` is an index from [`enumerate_cameras`]; `None` lets GStreamer choose
    pub fn new(device: Option<usize>) -> Self {
        Self {
            device,
            running: None,
        }
    }

    fn resolve_device_path(&self) -> BackendResult<Option<String>> {
        let Some(index) = self.device else {
            return Ok(None);
        };
        let cameras = enumerate_cameras()?;
        let camera = cameras
            .into_iter()
            .find(|c| c.index == index)
            .ok_or_else(|| BackendError::DeviceNotFound(format!("camera index {}", index)))?;
        camera
            .path
            .map(Some)
            .ok_or_else(|| BackendError::DeviceNotFound(format!("{} has no device path", camera.name)))
    }
}

impl FrameSource for GstFrameSource {
    fn name(&self) -> String {
        match self.device {
            Some(index) => format!("camera:{}", index),
            None => "camera:auto".to_string(),
        }
    }

    fn start(&mut self, sink: FrameSink) -> BackendResult<()> {
        if self.running.is_some() {
            return Err(BackendError::AlreadyRunning);
        }

        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let device_path = self.resolve_device_path()?;
        let description = build_pipeline_string(device_path.as_deref());
        info!(pipeline = %description, "Launching camera pipeline");

        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| BackendError::InitializationFailed("Failed to cast to pipeline".into()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".into()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| BackendError::InitializationFailed("Failed to cast appsink".into()))?;

        let frame_counter = Arc::new(AtomicU64::new(0));
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let captured_at = Instant::now();
                    let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);

                    let sample = appsink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                    let frame = sample_to_frame(&sample, captured_at);
                    if frame.is_none() {
                        debug!(frame = frame_num, "Sample without readable buffer");
                    }

                    match sink.deliver(frame) {
                        Delivery::Closed => return Err(gstreamer::FlowError::Flushing),
                        Delivery::Stalled => {
                            trace!(frame = frame_num, "Frame discarded, analyzer behind");
                        }
                        Delivery::Queued | Delivery::Replaced => {}
                    }

                    if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                        trace!(
                            frame = frame_num,
                            elapsed_us = captured_at.elapsed().as_micros(),
                            "Frame delivered"
                        );
                    }

                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            BackendError::InitializationFailed(format!("Failed to start pipeline: {}", e))
        })?;

        let (result, state, pending) = pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::START_TIMEOUT_SECS,
        ));
        debug!(?result, ?state, ?pending, "Pipeline state after start");
        if result.is_err() {
            let message = bus_error(&pipeline).unwrap_or_else(|| "pipeline did not start".into());
            error!(error = %message, "Camera pipeline failed");
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(BackendError::InitializationFailed(message));
        }

        self.running = Some((pipeline, appsink));
        Ok(())
    }

    fn stop(&mut self) {
        let Some((pipeline, appsink)) = self.running.take() else {
            return;
        };

        // Drop the sink clone held by the callback
        appsink.set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());

        if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
            warn!(error = %e, "Failed to stop camera pipeline");
        }
        let (result, state, _) = pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        debug!(?result, ?state, "Camera pipeline stopped");
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// First error message waiting on the pipeline bus
fn bus_error(pipeline: &gstreamer::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    while let Some(msg) = bus.pop() {
        if let gstreamer::MessageView::Error(err) = msg.view() {
            return Some(err.error().to_string());
        }
    }
    None
}
