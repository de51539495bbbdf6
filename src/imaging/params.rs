//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`FileRenderer`](crate::render::FileRenderer) (which
//! decides which renditions to write) and the [`backend`](super::backend)
//! (which does the pixel work), so a mock backend can stand in for tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`CropRect`]: Absolute pixel region cut out of the source before scaling.
//! - [`ResizeParams`]: Aspect-preserving resize to a target width.
//! - [`FillParams`]: Fill-resize and center-crop to exact dimensions.

use serde::Serialize;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Absolute pixel region of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Aspect-preserving resize: the height follows from the (cropped) source.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub crop: Option<CropRect>,
    pub width: u32,
    pub allow_upscaling: bool,
    pub quality: Quality,
}

/// Exact-dimension output: fill-resize, then center-crop.
#[derive(Debug, Clone, PartialEq)]
pub struct FillParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub crop: Option<CropRect>,
    pub width: u32,
    pub height: u32,
    pub allow_upscaling: bool,
    pub quality: Quality,
}
