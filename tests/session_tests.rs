// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for frame delivery and camera sessions

use barcode_scanner::app::frame_processor::{BarcodeDecoder, DecodeImage, Symbol};
use barcode_scanner::app::{Message, NavEvent, ScannerApp, Screen, Services};
use barcode_scanner::backends::camera::types::{BackendError, BackendResult, CameraFrame, PixelFormat};
use barcode_scanner::backends::camera::{
    CameraSession, Delivery, FileFrameSource, FrameBudget, FrameSink, FrameSource,
    LatestFrameSlot, PreviewHandle, SlotTake, shared_source,
};
use barcode_scanner::backends::picker::PathImagePicker;
use barcode_scanner::config::Config;
use barcode_scanner::errors::DecodeError;
use futures::channel::mpsc::UnboundedReceiver;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;

fn gray_frame() -> CameraFrame {
    CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![0u8; 4])
}

/// Source whose frames are pushed by the test
#[derive(Clone, Default)]
struct ManualSource {
    sink: Arc<Mutex<Option<FrameSink>>>,
    starts: Arc<AtomicUsize>,
}

impl ManualSource {
    fn push(&self, image: Option<CameraFrame>) -> Option<Delivery> {
        self.sink.lock().unwrap().as_ref().map(|sink| sink.deliver(image))
    }
}

impl FrameSource for ManualSource {
    fn name(&self) -> String {
        "manual".to_string()
    }

    fn start(&mut self, sink: FrameSink) -> BackendResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.sink.lock().unwrap().take();
    }
}

/// Source that never starts
struct BrokenSource;

impl FrameSource for BrokenSource {
    fn name(&self) -> String {
        "broken".to_string()
    }

    fn start(&mut self, _sink: FrameSink) -> BackendResult<()> {
        Err(BackendError::DeviceNotFound("no camera".to_string()))
    }

    fn stop(&mut self) {}
}

/// Source whose first start fails and later starts succeed
#[derive(Clone, Default)]
struct FlakySource {
    inner: ManualSource,
}

impl FrameSource for FlakySource {
    fn name(&self) -> String {
        "flaky".to_string()
    }

    fn start(&mut self, sink: FrameSink) -> BackendResult<()> {
        if self.inner.starts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(BackendError::DeviceNotFound("busy".to_string()));
        }
        *self.inner.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.inner.stop();
    }
}

/// Decoder that reports one payload for every image
struct EchoDecoder(&'static str);

impl BarcodeDecoder for EchoDecoder {
    fn decode(&self, _image: DecodeImage) -> BoxFuture<'static, Result<Vec<Symbol>, DecodeError>> {
        futures::future::ready(Ok(vec![Symbol::qr(Some(self.0.to_string()))])).boxed()
    }
}

fn services(source: impl FrameSource + 'static) -> Services {
    Services {
        source: shared_source(source),
        decoder: Arc::new(EchoDecoder("CODE-1")),
        picker: Arc::new(PathImagePicker::cancelled()),
        runtime: Handle::current(),
    }
}

async fn next_message(receiver: &mut UnboundedReceiver<Message>) -> Message {
    tokio::time::timeout(Duration::from_secs(5), receiver.next())
        .await
        .expect("timed out waiting for a message")
        .expect("channel closed")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[test]
fn test_keep_latest_releases_older_frame() {
    let slot = LatestFrameSlot::new();
    let budget = FrameBudget::new(4);
    let sink = FrameSink::new(Arc::clone(&slot), Arc::clone(&budget), PreviewHandle::default());

    assert_eq!(sink.deliver(Some(gray_frame())), Delivery::Queued);
    assert_eq!(sink.deliver(Some(gray_frame())), Delivery::Replaced);

    assert_eq!(budget.released(), 1);
    assert_eq!(budget.outstanding(), 1);
    assert_eq!(slot.dropped(), 1);

    match slot.take_timeout(Duration::from_millis(10)) {
        SlotTake::Frame(frame) => {
            // The newer frame survived
            assert_eq!(frame.sequence(), 1);
            frame.release();
        }
        other => panic!("expected a frame, got {:?}", other),
    }
    assert_eq!(budget.outstanding(), 0);
}

#[test]
fn test_exhausted_budget_stalls_delivery() {
    let slot = LatestFrameSlot::new();
    let budget = FrameBudget::new(1);
    let sink = FrameSink::new(Arc::clone(&slot), Arc::clone(&budget), PreviewHandle::default());

    assert_eq!(sink.deliver(Some(gray_frame())), Delivery::Queued);
    let SlotTake::Frame(held) = slot.take_timeout(Duration::from_millis(10)) else {
        panic!("expected a frame");
    };

    // The held frame is never released, so nothing else gets through
    assert_eq!(sink.deliver(Some(gray_frame())), Delivery::Stalled);
    assert_eq!(sink.deliver(Some(gray_frame())), Delivery::Stalled);
    assert!(matches!(
        slot.take_timeout(Duration::from_millis(10)),
        SlotTake::Empty
    ));

    held.release();
    assert_eq!(sink.deliver(Some(gray_frame())), Delivery::Queued);
}

#[test]
fn test_session_stop_releases_pending_frame() {
    let source = ManualSource::default();
    let handled = Arc::new(Mutex::new(Vec::new()));
    let handled_clone = Arc::clone(&handled);

    let session = CameraSession::start(shared_source(source.clone()), move |frame| {
        // Hold frames so the slot keeps the next one pending
        handled_clone.lock().unwrap().push(frame);
    })
    .unwrap();
    let budget = Arc::clone(session.budget());

    source.push(Some(gray_frame()));
    session.stop();

    assert_eq!(source.push(Some(gray_frame())), None);
    let held: Vec<_> = handled.lock().unwrap().drain(..).collect();
    for frame in held {
        frame.release();
    }
    assert_eq!(budget.outstanding(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_camera_round_trip_restores_delivery() {
    let source = ManualSource::default();
    let (sender, mut receiver) = futures::channel::mpsc::unbounded();
    let mut app = ScannerApp::new(&Config::default(), services(source.clone()), sender);

    // First visit
    app.update(Message::Navigate(NavEvent::OpenCamera));
    assert!(app.scan_session().is_some());
    source.push(Some(gray_frame()));
    let message = next_message(&mut receiver).await;
    app.update(message);
    assert_eq!(app.state().scanned_value.as_deref(), Some("CODE-1"));

    let first_budget = Arc::clone(app.scan_session().unwrap().budget());
    app.update(Message::Navigate(NavEvent::Back));
    assert_eq!(app.state().screen, Screen::Home);
    assert!(app.scan_session().is_none());
    assert_eq!(source.push(Some(gray_frame())), None);
    wait_until(|| first_budget.outstanding() == 0).await;

    // Second visit binds the same source again
    app.update(Message::Navigate(NavEvent::OpenCamera));
    assert_eq!(source.starts.load(Ordering::SeqCst), 2);
    assert!(app.state().scanned_value.is_none());

    source.push(Some(gray_frame()));
    let message = next_message(&mut receiver).await;
    assert!(matches!(message, Message::Detected { .. }));
    app.update(message);
    assert_eq!(app.state().scanned_value.as_deref(), Some("CODE-1"));

    app.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_preview_follows_latest_frame() {
    let source = ManualSource::default();
    let (sender, _receiver) = futures::channel::mpsc::unbounded();
    let mut app = ScannerApp::new(&Config::default(), services(source.clone()), sender);

    assert!(app.preview().is_none());
    app.update(Message::Navigate(NavEvent::OpenCamera));
    source.push(Some(CameraFrame::packed(3, 1, PixelFormat::Gray8, vec![1u8, 2, 3])));

    let preview = app.preview().unwrap();
    assert_eq!((preview.width, preview.height), (3, 1));

    app.update(Message::Navigate(NavEvent::Back));
    assert!(app.preview().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_camera_start_failure_is_reported() {
    let (sender, mut receiver) = futures::channel::mpsc::unbounded();
    let mut app = ScannerApp::new(&Config::default(), services(BrokenSource), sender);

    app.update(Message::Navigate(NavEvent::OpenCamera));
    assert!(app.scan_session().is_none());

    let message = next_message(&mut receiver).await;
    assert!(matches!(message, Message::CameraFailed { .. }));
    app.update(message);

    let text = app.state().notification.text().unwrap();
    assert!(text.starts_with("Error: "));
    assert!(text.contains("no camera"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_gallery_cancel_through_controller() {
    let (sender, mut receiver) = futures::channel::mpsc::unbounded();
    let mut app = ScannerApp::new(&Config::default(), services(BrokenSource), sender);

    app.update(Message::Navigate(NavEvent::OpenGallery));
    assert!(app.state().pending_pick.is_some());

    let message = next_message(&mut receiver).await;
    app.update(message);

    assert!(app.state().pending_pick.is_none());
    assert_eq!(app.state().notification.posted(), 0);
    assert_eq!(app.state().scanned_value, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_replay_source_feeds_analyzer() {
    let source = FileFrameSource::from_frame("still", gray_frame()).with_interval(Duration::from_millis(5));
    let (sender, mut receiver) = futures::channel::mpsc::unbounded();
    let mut app = ScannerApp::new(&Config::default(), services(source), sender);

    app.update(Message::Navigate(NavEvent::OpenCamera));
    let message = next_message(&mut receiver).await;
    app.update(message);
    assert_eq!(app.state().scanned_label(), "Scanned: CODE-1");

    let budget = Arc::clone(app.scan_session().unwrap().budget());
    app.update(Message::Quit);
    assert!(app.scan_session().is_none());
    wait_until(|| budget.outstanding() == 0).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_start_failure_keeps_new_session() {
    let source = FlakySource::default();
    let (sender, mut receiver) = futures::channel::mpsc::unbounded();
    let mut app = ScannerApp::new(&Config::default(), services(source.clone()), sender);

    app.update(Message::Navigate(NavEvent::OpenCamera));
    app.update(Message::Navigate(NavEvent::Back));
    app.update(Message::Navigate(NavEvent::OpenCamera));
    assert!(app.scan_session().is_some());

    // The first visit's failure is only handled now
    let message = next_message(&mut receiver).await;
    assert!(matches!(message, Message::CameraFailed { .. }));
    app.update(message);
    assert!(app.state().camera_session.is_some());
    assert_eq!(app.state().notification.posted(), 0);

    source.inner.push(Some(gray_frame()));
    let message = next_message(&mut receiver).await;
    app.update(message);
    assert_eq!(app.state().scanned_value.as_deref(), Some("CODE-1"));

    app.shutdown();
}
