// SPDX-License-Identifier: GPL-3.0-only

//! Image pickers
//!
//! The gallery flow asks an [`ImagePicker`] for one image. The desktop
//! implementation shows the native file dialog; the path picker returns a
//! preselected file (used by `scan <PATH>`).

use crate::constants::file_formats;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mime pattern the picker should restrict the selection to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimeFilter {
    pub pattern: &'static str,
}

impl MimeFilter {
    /// Any image type
    pub const IMAGES: MimeFilter = MimeFilter {
        pattern: file_formats::IMAGE_MIME,
    };

    /// File extensions matching the pattern
    pub fn extensions(&self) -> &'static [&'static str] {
        match self.pattern {
            file_formats::IMAGE_MIME => file_formats::IMAGE_EXTENSIONS,
            _ => &[],
        }
    }
}

/// A user-selected image, valid for one decode attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickedImage {
    /// A file on disk
    Path(PathBuf),
    /// Encoded image bytes (png, jpeg, ...)
    Bytes(Arc<[u8]>),
}

impl PickedImage {
    /// Short description for logging and display
    pub fn describe(&self) -> String {
        match self {
            PickedImage::Path(path) => path.display().to_string(),
            PickedImage::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

/// Lets the user choose a single image; `None` means the pick was cancelled
pub trait ImagePicker: Send + Sync {
    fn pick(&self, filter: MimeFilter) -> BoxFuture<'static, Option<PickedImage>>;
}

/// Native file dialog picker
#[derive(Debug, Clone, Default)]
pub struct DialogImagePicker {
    start_dir: Option<PathBuf>,
}

impl DialogImagePicker {
    pub fn new() -> Self {
        Self {
            start_dir: dirs::picture_dir(),
        }
    }
}

impl ImagePicker for DialogImagePicker {
    fn pick(&self, filter: MimeFilter) -> BoxFuture<'static, Option<PickedImage>> {
        let start_dir = self.start_dir.clone();
        async move {
            // The dialog blocks until the user answers
            let picked = tokio::task::spawn_blocking(move || {
                let mut dialog = rfd::FileDialog::new()
                    .set_title("Select an image with a barcode")
                    .add_filter("Images", filter.extensions());
                if let Some(dir) = start_dir {
                    dialog = dialog.set_directory(dir);
                }
                dialog.pick_file()
            })
            .await;

            match picked {
                Ok(Some(path)) => {
                    info!(path = %path.display(), "Image picked");
                    Some(PickedImage::Path(path))
                }
                Ok(None) => {
                    debug!("Image pick cancelled");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "File dialog task failed");
                    None
                }
            }
        }
        .boxed()
    }
}

/// Picker that always returns the same image
#[derive(Debug, Clone)]
pub struct PathImagePicker {
    image: Option<PickedImage>,
}

impl PathImagePicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            image: Some(PickedImage::Path(path.into())),
        }
    }

    /// Picker that behaves like a cancelled dialog
    pub fn cancelled() -> Self {
        Self { image: None }
    }
}

impl ImagePicker for PathImagePicker {
    fn pick(&self, _filter: MimeFilter) -> BoxFuture<'static, Option<PickedImage>> {
        futures::future::ready(self.image.clone()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_filter_extensions() {
        let extensions = MimeFilter::IMAGES.extensions();
        assert!(extensions.contains(&"png"));
        assert!(extensions.contains(&"jpg"));
    }

    #[test]
    fn test_unknown_filter_has_no_extensions() {
        let filter = MimeFilter { pattern: "video/*" };
        assert!(filter.extensions().is_empty());
    }

    #[tokio::test]
    async fn test_path_picker_returns_path() {
        let picker = PathImagePicker::new("/tmp/code.png");
        assert_eq!(
            picker.pick(MimeFilter::IMAGES).await,
            Some(PickedImage::Path(PathBuf::from("/tmp/code.png")))
        );
        assert_eq!(PathImagePicker::cancelled().pick(MimeFilter::IMAGES).await, None);
    }
}
