// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the frame analyzer

use barcode_scanner::app::frame_processor::{
    BarcodeDecoder, DecodeImage, DetectionCallback, FrameAnalyzer, Symbol,
};
use barcode_scanner::backends::camera::types::{CameraFrame, PixelFormat};
use barcode_scanner::backends::camera::{Frame, FrameBudget};
use barcode_scanner::errors::DecodeError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

type DecodeResult = Result<Vec<Symbol>, DecodeError>;

/// Decoder that returns a fixed result and counts calls
struct FixedDecoder {
    result: DecodeResult,
    calls: AtomicUsize,
}

impl FixedDecoder {
    fn new(result: DecodeResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }
}

impl BarcodeDecoder for FixedDecoder {
    fn decode(&self, _image: DecodeImage) -> BoxFuture<'static, DecodeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(self.result.clone()).boxed()
    }
}

/// Decoder whose result is supplied later through a channel
struct GatedDecoder {
    gate: Mutex<Option<oneshot::Receiver<DecodeResult>>>,
}

impl BarcodeDecoder for GatedDecoder {
    fn decode(&self, _image: DecodeImage) -> BoxFuture<'static, DecodeResult> {
        let gate = self.gate.lock().unwrap().take().expect("decoder used twice");
        async move {
            gate.await
                .unwrap_or_else(|_| Err(DecodeError::Worker("gate dropped".to_string())))
        }
        .boxed()
    }
}

fn recorder() -> (DetectionCallback, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let callback: DetectionCallback = Arc::new(move |value| {
        seen_clone.lock().unwrap().push(value);
    });
    (callback, seen)
}

fn image_frame(budget: &Arc<FrameBudget>) -> Frame {
    let image = Arc::new(CameraFrame::packed(2, 2, PixelFormat::Gray8, vec![0u8; 4]));
    Frame::new(Some(image), budget.try_acquire().unwrap())
}

fn qr(payload: Option<&str>) -> Symbol {
    Symbol::qr(payload.map(str::to_string))
}

#[tokio::test]
async fn test_frame_without_image_is_released_without_decoding() {
    let (callback, seen) = recorder();
    let decoder = FixedDecoder::new(Ok(vec![qr(Some("X"))]));
    let analyzer = FrameAnalyzer::new(decoder.clone(), Handle::current(), callback);
    let budget = FrameBudget::new(1);

    let frame = Frame::new(None, budget.try_acquire().unwrap());
    assert!(analyzer.analyze(frame).is_none());

    assert_eq!(budget.released(), 1);
    assert_eq!(budget.outstanding(), 0);
    assert_eq!(decoder.calls.load(Ordering::SeqCst), 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_first_payload_reported_once() {
    let (callback, seen) = recorder();
    let decoder = FixedDecoder::new(Ok(vec![qr(None), qr(Some("A1")), qr(Some("B2"))]));
    let analyzer = FrameAnalyzer::new(decoder, Handle::current(), callback);
    let budget = FrameBudget::new(1);

    analyzer.analyze(image_frame(&budget)).unwrap().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["A1".to_string()]);
    assert_eq!(budget.released(), 1);
}

#[tokio::test]
async fn test_every_outcome_releases_exactly_once() {
    let outcomes: Vec<DecodeResult> = vec![
        Ok(vec![]),
        Ok(vec![qr(None)]),
        Ok(vec![qr(Some("value"))]),
        Err(DecodeError::InvalidImage("broken".to_string())),
    ];

    for outcome in outcomes {
        let (callback, _seen) = recorder();
        let analyzer = FrameAnalyzer::new(FixedDecoder::new(outcome.clone()), Handle::current(), callback);
        let budget = FrameBudget::new(1);

        analyzer.analyze(image_frame(&budget)).unwrap().await.unwrap();

        assert_eq!(budget.issued(), 1, "outcome {:?}", outcome);
        assert_eq!(budget.released(), 1, "outcome {:?}", outcome);
        assert_eq!(budget.outstanding(), 0, "outcome {:?}", outcome);
    }
}

#[tokio::test]
async fn test_failures_and_empty_results_are_silent() {
    for outcome in [
        Ok(vec![]),
        Ok(vec![qr(None), qr(None)]),
        Err(DecodeError::Worker("panicked".to_string())),
    ] {
        let (callback, seen) = recorder();
        let analyzer = FrameAnalyzer::new(FixedDecoder::new(outcome), Handle::current(), callback);
        let budget = FrameBudget::new(1);

        analyzer.analyze(image_frame(&budget)).unwrap().await.unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_release_waits_for_decode_to_settle() {
    let (tx, rx) = oneshot::channel();
    let decoder = Arc::new(GatedDecoder {
        gate: Mutex::new(Some(rx)),
    });
    let (callback, seen) = recorder();
    let analyzer = FrameAnalyzer::new(decoder, Handle::current(), callback);
    let budget = FrameBudget::new(1);

    let handle = analyzer.analyze(image_frame(&budget)).unwrap();
    tokio::task::yield_now().await;

    assert_eq!(budget.released(), 0);
    assert_eq!(budget.outstanding(), 1);

    tx.send(Ok(vec![qr(Some("late"))])).unwrap();
    handle.await.unwrap();

    assert_eq!(budget.released(), 1);
    assert_eq!(*seen.lock().unwrap(), vec!["late".to_string()]);
}

#[tokio::test]
async fn test_deactivate_discards_in_flight_result() {
    let (tx, rx) = oneshot::channel();
    let decoder = Arc::new(GatedDecoder {
        gate: Mutex::new(Some(rx)),
    });
    let (callback, seen) = recorder();
    let analyzer = FrameAnalyzer::new(decoder, Handle::current(), callback);
    let budget = FrameBudget::new(1);

    let handle = analyzer.analyze(image_frame(&budget)).unwrap();
    analyzer.deactivate();

    tx.send(Ok(vec![qr(Some("too late"))])).unwrap();
    handle.await.unwrap();

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(budget.released(), 1);
}

#[tokio::test]
async fn test_overlapping_decodes_each_report() {
    let (callback, seen) = recorder();
    let decoder = FixedDecoder::new(Ok(vec![qr(Some("same"))]));
    let analyzer = FrameAnalyzer::new(decoder, Handle::current(), callback);
    let budget = FrameBudget::new(2);

    let first = analyzer.analyze(image_frame(&budget)).unwrap();
    let second = analyzer.analyze(image_frame(&budget)).unwrap();
    first.await.unwrap();
    second.await.unwrap();

    // No duplicate suppression
    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(budget.released(), 2);
}
