//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, resize, and fill.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Everything is statically linked into the binary.

use super::params::{FillParams, ResizeParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Output {width}x{height} exceeds the {max_dimension}px size limit")]
    OutputTooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
    },
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Trait for image processing backends.
///
/// `Sync` is required because renditions of one picture are rendered in
/// parallel on the rayon pool.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Crop (optionally), then scale to the target width keeping the aspect
    /// ratio. Returns the dimensions of the written file.
    fn resize(&self, params: &ResizeParams) -> Result<Dimensions, BackendError>;

    /// Crop (optionally), then fill-resize and center-crop to exact
    /// dimensions. Returns the dimensions of the written file.
    fn fill(&self, params: &FillParams) -> Result<Dimensions, BackendError>;
}
