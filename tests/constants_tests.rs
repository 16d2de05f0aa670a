// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use barcode_scanner::constants::{file_formats, messages, replay, ui};

#[test]
fn test_image_extensions_cover_common_formats() {
    for ext in ["png", "jpg", "jpeg", "webp"] {
        assert!(
            file_formats::is_image_extension(ext),
            "{} should be accepted",
            ext
        );
    }
    assert!(!file_formats::is_image_extension("mp4"));
}

#[test]
fn test_user_facing_texts() {
    assert_eq!(messages::NO_BARCODE_FOUND, "No barcode found");
    assert_eq!(ui::PLACEHOLDER, "Scan a barcode...");
    assert!(ui::SCANNED_PREFIX.ends_with(' '));
}

#[test]
fn test_replay_runs_at_camera_rate() {
    // Roughly 30 frames per second
    let interval = replay::FRAME_INTERVAL.as_millis();
    assert!((30..=40).contains(&interval));
}
