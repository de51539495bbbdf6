//! The render call: caller arguments in, [`Picture`] out.
//!
//! ```text
//! image ──resolve──► handle ──open──► source ──crop──► crop / focus area
//!                                       │
//! sizes ──parse──┐                      ▼
//! densities ─────┼──────────────► plan_renditions ──► assemble ──► Picture
//! special fn ────┘
//! ```
//!
//! Argument problems are reported before anything is opened. Everything from
//! opening the source onwards is fail-fast: the first error ends the call and
//! no partial picture is returned.

use crate::crop::{CropError, CropInstruction, CropResolver};
use crate::density::{DensityError, DensityParsing, parse_densities};
use crate::html::ImageAttributes;
use crate::markup::{DensitySuffix, PictureMarkupPlan, assemble};
use crate::planner::{
    FallbackPolicy, PlanError, PlanOptions, SpecialFunction, UnknownSpecialFunction,
    plan_renditions,
};
use crate::render::{Renderer, RenditionFailure};
use crate::sizes::parse_sizes;
use crate::source::{ImageResolver, UnresolvableImage};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PictureError {
    #[error(transparent)]
    UnresolvableImage(#[from] UnresolvableImage),
    #[error("File extension {0:?} is not an allowed image extension")]
    InvalidFileExtension(String),
    #[error(transparent)]
    Density(#[from] DensityError),
    #[error(transparent)]
    UnknownSpecialFunction(#[from] UnknownSpecialFunction),
    #[error(transparent)]
    InvalidCropSpecification(#[from] CropError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("Rendition failed: {0}")]
    Rendition(#[from] RenditionFailure),
}

/// Arguments of one render call, as a template or the CLI supplies them.
#[derive(Debug, Clone, Default)]
pub struct PictureArgs {
    pub image: String,
    pub sizes: String,
    pub densities: String,
    pub crop: Option<String>,
    /// Empty means the default variant.
    pub crop_variant: String,
    pub special_function: String,
    pub file_extension: Option<String>,
    pub absolute_url: bool,
    pub attributes: ImageAttributes,
}

/// Policies of the `[srcset]` config section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SrcsetPolicy {
    pub density_parsing: DensityParsing,
    pub density_suffix: DensitySuffix,
    pub fallback: FallbackPolicy,
}

/// Collaborators of a render call.
pub struct PictureEnv<'a> {
    pub resolver: &'a dyn ImageResolver,
    pub crop_resolver: &'a dyn CropResolver,
    pub renderer: &'a dyn Renderer,
    /// Whether a (lower-cased, dot-less) extension may be used as output format.
    pub allowed_extension: &'a dyn Fn(&str) -> bool,
    pub policy: SrcsetPolicy,
}

/// Everything needed to write a `<picture>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Picture {
    #[serde(flatten)]
    pub plan: PictureMarkupPlan,
    pub focus_area: Option<CropInstruction>,
    pub attributes: ImageAttributes,
}

/// Normalized extension override; `None` when absent or blank.
fn extension_override(
    extension: Option<&str>,
    allowed: &dyn Fn(&str) -> bool,
) -> Result<Option<String>, PictureError> {
    let Some(ext) = extension
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
    else {
        return Ok(None);
    };
    if allowed(&ext) {
        Ok(Some(ext))
    } else {
        Err(PictureError::InvalidFileExtension(ext))
    }
}

pub fn build_picture(args: &PictureArgs, env: &PictureEnv<'_>) -> Result<Picture, PictureError> {
    let handle = env.resolver.resolve(&args.image)?;
    let file_extension = extension_override(args.file_extension.as_deref(), env.allowed_extension)?;

    let sizes = parse_sizes(&args.sizes);
    let densities = parse_densities(&args.densities, env.policy.density_parsing)?;
    let special_function: SpecialFunction = args.special_function.parse()?;

    let source = env.renderer.open(&handle)?;
    let crop = env.crop_resolver.resolve_crop(
        args.crop.as_deref(),
        &args.crop_variant,
        source.dimensions,
    )?;

    let options = PlanOptions {
        crop: crop.area,
        special_function,
        file_extension,
        absolute_urls: args.absolute_url,
        fallback: env.policy.fallback,
    };
    let renditions = plan_renditions(env.renderer, &source, &sizes, &densities, &options)?;
    log::debug!(
        "{}: {} sources, fallback {}",
        source.path.display(),
        renditions.groups.len(),
        renditions.fallback.as_ref().map_or("none", |f| f.url.as_str())
    );

    Ok(Picture {
        plan: assemble(&renditions, env.policy.density_suffix),
        focus_area: crop.focus_area,
        attributes: args.attributes.clone(),
    })
}
