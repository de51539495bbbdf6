//! Crop variants: which part of the source image a picture shows.
//!
//! A crop specification is a JSON object keyed by variant name. Each variant
//! may carry a `cropArea` (the region that is rendered) and a `focusArea` (a
//! hint for client-side art direction, exposed as `data-focus-area` on the
//! `<picture>`). Areas are relative to the image, `0.0..=1.0` on both axes:
//!
//! ```json
//! {
//!   "default": {
//!     "cropArea":  {"x": 0.1, "y": 0.0, "width": 0.8, "height": 1.0},
//!     "focusArea": {"x": 0.4, "y": 0.3, "width": 0.2, "height": 0.2}
//!   },
//!   "square": {
//!     "cropArea":  {"x": 0.125, "y": 0.0, "width": 0.75, "height": 1.0}
//!   }
//! }
//! ```
//!
//! The full area `(0, 0, 1, 1)` is the same as no area at all.

use crate::imaging::{CropRect, Dimensions};
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Absolute pixel rectangle handed to the renderer.
pub type CropInstruction = CropRect;

/// Variant used when none is requested.
pub const DEFAULT_VARIANT: &str = "default";

#[derive(Error, Debug)]
pub enum CropError {
    #[error("Invalid crop specification: {0}")]
    InvalidSpecification(String),
    #[error("Invalid crop specification: {0}")]
    Json(#[from] serde_json::Error),
}

/// A rectangle in relative image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelativeArea {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RelativeArea {
    /// The whole image.
    pub const FULL: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    fn validate(&self, label: &str) -> Result<(), CropError> {
        let values = [self.x, self.y, self.width, self.height];
        let in_unit_range = values.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v));
        // Tolerate float noise from editors that store e.g. 0.1 + 0.9
        let fits = self.x + self.width <= 1.0 + 1e-6 && self.y + self.height <= 1.0 + 1e-6;
        if in_unit_range && fits && self.width > 0.0 && self.height > 0.0 {
            Ok(())
        } else {
            Err(CropError::InvalidSpecification(format!(
                "{label} {:?} is not inside the image",
                self
            )))
        }
    }

    /// Convert to pixels of an image with the given dimensions.
    pub fn to_absolute(&self, dims: Dimensions) -> CropInstruction {
        let w = dims.width as f64;
        let h = dims.height as f64;
        let x = (self.x * w).round() as u32;
        let y = (self.y * h).round() as u32;
        CropRect {
            x: x.min(dims.width),
            y: y.min(dims.height),
            width: ((self.width * w).round() as u32).min(dims.width - x.min(dims.width)),
            height: ((self.height * h).round() as u32).min(dims.height - y.min(dims.height)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CropVariant {
    #[serde(default)]
    crop_area: Option<RelativeArea>,
    #[serde(default)]
    focus_area: Option<RelativeArea>,
}

/// Parsed crop specification.
#[derive(Debug, Clone, Default)]
pub struct CropVariants {
    variants: BTreeMap<String, CropVariant>,
}

impl CropVariants {
    /// Parse a JSON crop specification. Blank input yields no variants.
    pub fn parse(spec: &str) -> Result<Self, CropError> {
        if spec.trim().is_empty() {
            return Ok(Self::default());
        }
        let variants: BTreeMap<String, CropVariant> = serde_json::from_str(spec)?;
        for (name, variant) in &variants {
            if let Some(area) = &variant.crop_area {
                area.validate(&format!("cropArea of variant {name:?}"))?;
            }
            if let Some(area) = &variant.focus_area {
                area.validate(&format!("focusArea of variant {name:?}"))?;
            }
        }
        Ok(Self { variants })
    }

    /// Crop area of `variant`, `None` when absent or covering the whole image.
    pub fn crop_area(&self, variant: &str) -> Option<RelativeArea> {
        self.variants
            .get(variant)
            .and_then(|v| v.crop_area)
            .filter(|area| !area.is_full())
    }

    /// Focus area of `variant`, `None` when absent or covering the whole image.
    pub fn focus_area(&self, variant: &str) -> Option<RelativeArea> {
        self.variants
            .get(variant)
            .and_then(|v| v.focus_area)
            .filter(|area| !area.is_full())
    }
}

/// Crop and focus area of one variant, in source pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedCrop {
    pub area: Option<CropInstruction>,
    pub focus_area: Option<CropInstruction>,
}

/// Turns a crop specification and variant name into pixel rectangles.
pub trait CropResolver: Sync {
    fn resolve_crop(
        &self,
        spec: Option<&str>,
        variant: &str,
        dims: Dimensions,
    ) -> Result<ResolvedCrop, CropError>;
}

/// [`CropResolver`] for the JSON variant format described in the
/// [module docs](self).
#[derive(Debug, Default)]
pub struct VariantCropResolver;

impl CropResolver for VariantCropResolver {
    fn resolve_crop(
        &self,
        spec: Option<&str>,
        variant: &str,
        dims: Dimensions,
    ) -> Result<ResolvedCrop, CropError> {
        let variants = CropVariants::parse(spec.unwrap_or_default())?;
        let variant = if variant.is_empty() {
            DEFAULT_VARIANT
        } else {
            variant
        };
        Ok(ResolvedCrop {
            area: variants.crop_area(variant).map(|a| a.to_absolute(dims)),
            focus_area: variants.focus_area(variant).map(|a| a.to_absolute(dims)),
        })
    }
}
