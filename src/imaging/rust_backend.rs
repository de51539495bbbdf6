//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | Crop | `image::DynamicImage::crop_imm` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Fill (exact crop) | `image::DynamicImage::resize_to_fill` |
//! | Encode → JPEG / PNG | `image` crate encoders |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{calculate_fill_target, calculate_resize_dimensions, clamp_crop};
use super::params::{CropRect, FillParams, ResizeParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::BufWriter;
use std::path::Path;

/// Output formats this backend can encode, by file extension.
const OUTPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "avif"];

/// Returns the file extensions the backend can write.
pub fn supported_output_extensions() -> &'static [&'static str] {
    OUTPUT_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Load the source and cut out the requested region.
fn load_region(path: &Path, crop: Option<CropRect>) -> Result<DynamicImage, BackendError> {
    let img = load_image(path)?;
    match crop {
        None => Ok(img),
        Some(crop) => {
            let region = clamp_crop((img.width(), img.height()), Some(crop));
            Ok(img.crop_imm(region.x, region.y, region.width, region.height))
        }
    }
}

/// Save a DynamicImage to the given path, inferring format from extension.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let writer = BufWriter::new(file);
    let encoded = match ext.as_str() {
        "jpg" | "jpeg" => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
                writer,
                quality as u8,
            ))
        }
        "png" => img.write_with_encoder(image::codecs::png::PngEncoder::new(writer)),
        "webp" => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(image::codecs::webp::WebPEncoder::new_lossless(writer))
        }
        "avif" => img.write_with_encoder(
            image::codecs::avif::AvifEncoder::new_with_speed_quality(writer, 6, quality as u8),
        ),
        other => {
            return Err(BackendError::ProcessingFailed(format!(
                "Unsupported output format: {}",
                other
            )));
        }
    };
    encoded.map_err(|e| {
        BackendError::ProcessingFailed(format!("Encoding {} failed: {}", path.display(), e))
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<Dimensions, BackendError> {
        let img = load_region(&params.source, params.crop)?;
        let (width, height) = calculate_resize_dimensions(
            (img.width(), img.height()),
            params.width,
            params.allow_upscaling,
        );
        let resized = img.resize_exact(width, height, FilterType::Lanczos3);
        save_image(&resized, &params.output, params.quality.value())?;
        Ok(Dimensions { width, height })
    }

    fn fill(&self, params: &FillParams) -> Result<Dimensions, BackendError> {
        let img = load_region(&params.source, params.crop)?;
        let (width, height) = calculate_fill_target(
            (img.width(), img.height()),
            (params.width, params.height),
            params.allow_upscaling,
        );
        let filled = img.resize_to_fill(width, height, FilterType::Lanczos3);
        save_image(&filled, &params.output, params.quality.value())?;
        Ok(Dimensions {
            width: filled.width(),
            height: filled.height(),
        })
    }
}
