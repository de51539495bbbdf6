//! Shared test utilities.
//!
//! - [`create_test_jpeg`] writes a small synthetic JPEG for backend tests.
//! - [`RecordingRenderer`] is a [`Renderer`] that records every instruction and
//!   answers with deterministic URLs, so planner and pipeline tests run
//!   without touching pixels.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let renderer = RecordingRenderer::default();
//! let plan = plan_renditions(&renderer, &test_source(1000, 800), &sizes, &densities, &options)?;
//! assert_eq!(renderer.calls().len(), 3);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::imaging::Dimensions;
use crate::render::{RenderInstruction, RenderedImage, Renderer, RenditionFailure, ResizeMode};
use crate::source::{ImageHandle, SourceImage};

// =========================================================================
// Fixture setup
// =========================================================================

/// Write a `width × height` JPEG with a simple gradient.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

/// A source image that was never read from disk.
pub fn test_source(width: u32, height: u32) -> SourceImage {
    SourceImage {
        path: PathBuf::from("/photos/dawn.jpg"),
        dimensions: Dimensions { width, height },
        content_hash: "0123456789abcdef".to_string(),
    }
}

// =========================================================================
// Recording renderer
// =========================================================================

/// Renderer that records instructions instead of encoding.
///
/// Aspect-preserving renditions keep the source's aspect ratio; exact crops
/// report the requested dimensions. URLs are `/r/{label}.{ext}`, or
/// `https://example.com/r/...` in absolute form.
pub struct RecordingRenderer {
    pub source_dimensions: Dimensions,
    pub calls: Mutex<Vec<RenderInstruction>>,
    pub fail_at_width: Option<u32>,
    pub max_dimension: Option<u32>,
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self {
            source_dimensions: Dimensions {
                width: 1000,
                height: 800,
            },
            calls: Mutex::new(Vec::new()),
            fail_at_width: None,
            max_dimension: None,
        }
    }
}

impl RecordingRenderer {
    /// Fail every rendition whose target width is `width`.
    pub fn failing_at_width(width: u32) -> Self {
        Self {
            fail_at_width: Some(width),
            ..Self::default()
        }
    }

    /// Report a size limit to the planner.
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: Some(max_dimension),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RenderInstruction> {
        self.calls.lock().unwrap().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn open(&self, handle: &ImageHandle) -> Result<SourceImage, RenditionFailure> {
        Ok(SourceImage {
            path: handle.path().to_path_buf(),
            dimensions: self.source_dimensions,
            content_hash: "0123456789abcdef".to_string(),
        })
    }

    fn render(
        &self,
        source: &SourceImage,
        instruction: &RenderInstruction,
    ) -> Result<RenderedImage, RenditionFailure> {
        self.calls.lock().unwrap().push(instruction.clone());

        let (width, height) = match instruction.resize {
            ResizeMode::AspectPreserving { width } => {
                let dims = source.dimensions;
                let height = (width as f64 * dims.height as f64 / dims.width as f64).round();
                (width, height as u32)
            }
            ResizeMode::ExactCrop { width, height } => (width, height),
        };
        if self.fail_at_width == Some(width) {
            return Err(RenditionFailure::MissingFile(source.path.clone()));
        }

        let ext = instruction.file_extension.as_deref().unwrap_or("jpg");
        let crop = match instruction.crop {
            Some(c) => format!("-c{}.{}.{}.{}", c.x, c.y, c.width, c.height),
            None => String::new(),
        };
        Ok(RenderedImage {
            url: format!("/r/{}{}.{}", instruction.label(), crop, ext),
            width,
            height,
        })
    }

    fn absolute_url(&self, url: &str) -> String {
        format!("https://example.com{}", url)
    }

    fn max_dimension(&self) -> Option<u32> {
        self.max_dimension
    }
}
