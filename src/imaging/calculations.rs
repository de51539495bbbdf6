//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::BackendError;
use super::params::CropRect;

/// Default limit on either edge of an output image.
pub const DEFAULT_MAX_DIMENSION: u32 = 16_384;

/// Clamp an optional crop region to the bounds of the source image.
///
/// `None` selects the whole image. A region that falls entirely outside the
/// image collapses to the full image as well, so callers always get a
/// non-empty rectangle.
pub fn clamp_crop(source: (u32, u32), crop: Option<CropRect>) -> CropRect {
    let (src_w, src_h) = source;
    let full = CropRect {
        x: 0,
        y: 0,
        width: src_w,
        height: src_h,
    };
    let Some(crop) = crop else {
        return full;
    };

    let x = crop.x.min(src_w);
    let y = crop.y.min(src_h);
    let width = crop.width.min(src_w - x);
    let height = crop.height.min(src_h - y);

    if width == 0 || height == 0 {
        full
    } else {
        CropRect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Output dimensions for an aspect-preserving resize to `target_width`.
///
/// # Arguments
/// * `region` - Dimensions of the (cropped) source region
/// * `target_width` - Requested output width
/// * `allow_upscaling` - When false, the output never exceeds the region
///
/// # Examples
/// ```
/// # use responsive_picture::imaging::calculate_resize_dimensions;
/// // 1000x800 scaled to 634 wide → 634x507
/// assert_eq!(calculate_resize_dimensions((1000, 800), 634, true), (634, 507));
/// ```
pub fn calculate_resize_dimensions(
    region: (u32, u32),
    target_width: u32,
    allow_upscaling: bool,
) -> (u32, u32) {
    let (region_w, region_h) = region;
    let width = if allow_upscaling {
        target_width
    } else {
        target_width.min(region_w)
    };
    let height = (region_h as f64 * width as f64 / region_w as f64).round() as u32;
    (width.max(1), height.max(1))
}

/// Output dimensions for an exact-crop request of `target`.
///
/// With upscaling allowed this is `target` itself. Otherwise the target is
/// scaled down (keeping its aspect ratio) until it fits inside the region.
pub fn calculate_fill_target(
    region: (u32, u32),
    target: (u32, u32),
    allow_upscaling: bool,
) -> (u32, u32) {
    let (region_w, region_h) = region;
    let (tgt_w, tgt_h) = target;

    if allow_upscaling || (tgt_w <= region_w && tgt_h <= region_h) {
        return target;
    }

    let scale = (region_w as f64 / tgt_w as f64).min(region_h as f64 / tgt_h as f64);
    let w = (tgt_w as f64 * scale).round() as u32;
    let h = (tgt_h as f64 * scale).round() as u32;
    (w.max(1), h.max(1))
}

/// Reject output dimensions with an edge longer than `max_dimension`.
///
/// Checked before decoding, so oversized requests never allocate a buffer.
pub fn check_output_dimensions(
    output: (u32, u32),
    max_dimension: u32,
) -> Result<(), BackendError> {
    let (width, height) = output;
    if width > max_dimension || height > max_dimension {
        return Err(BackendError::OutputTooLarge {
            width,
            height,
            max_dimension,
        });
    }
    Ok(())
}
