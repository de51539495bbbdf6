//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | crop + Lanczos3 `resize_exact` |
//! | **Fill** | crop + `resize_to_fill` |
//! | **Encode** | JPEG, PNG, WebP (lossless), AVIF (rav1e) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    DEFAULT_MAX_DIMENSION, calculate_fill_target, calculate_resize_dimensions,
    check_output_dimensions, clamp_crop,
};
pub use params::{CropRect, FillParams, Quality, ResizeParams};
pub use rust_backend::{RustBackend, supported_output_extensions};
