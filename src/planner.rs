//! Rendition planning: size definitions × pixel densities → rendered images.
//!
//! For every size definition (in order) and every density (in order) one
//! [`RenderInstruction`] is derived:
//!
//! | Special function | Instruction |
//! |---|---|
//! | none | `AspectPreserving { width: density × width }` |
//! | `square` | `ExactCrop { width: t, height: t }` with `t = density × width` |
//!
//! The crop rectangle and the extension override are forwarded unchanged in
//! both cases.
//!
//! One extra rendition at density `1` is requested for the default size
//! definition and becomes the fallback `<img>`. It is requested even when the
//! density list already contains `1`, so the fallback exists for lists such as
//! `"2, 3"`.
//!
//! All instructions are derived (and validated) before the renderer is called.
//! The renderer calls themselves run on the rayon pool; results are collected
//! in input order and the first failure abandons the plan.

use crate::crop::CropInstruction;
use crate::density::PixelDensity;
use crate::render::{RenderInstruction, Renderer, RenditionFailure, ResizeMode};
use crate::sizes::SizeDefinition;
use crate::source::SourceImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Malformed size token {0:?}: expected a pixel width")]
    MalformedSizeToken(String),
    #[error("Size {width:?} at density {density} does not yield a usable pixel width")]
    DegenerateWidth {
        width: String,
        density: PixelDensity,
    },
    #[error(
        "Size {width:?} at density {density} exceeds the {max_dimension}px rendition size limit"
    )]
    WidthTooLarge {
        width: String,
        density: PixelDensity,
        max_dimension: u32,
    },
    #[error("Rendition failed: {0}")]
    Rendition(#[from] RenditionFailure),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown special function {0:?}, the only supported value is \"square\"")]
pub struct UnknownSpecialFunction(pub String);

/// A named override of the normal aspect-preserving resize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialFunction {
    #[default]
    None,
    /// Exact square renditions.
    Square,
}

impl FromStr for SpecialFunction {
    type Err = UnknownSpecialFunction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(SpecialFunction::None),
            "square" => Ok(SpecialFunction::Square),
            other => Err(UnknownSpecialFunction(other.to_string())),
        }
    }
}

/// Which default size definition supplies the fallback image when the sizes
/// string contains more than one bare width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    #[default]
    First,
    Last,
}

impl FallbackPolicy {
    /// Index of the size definition that supplies the fallback, if any.
    pub fn select(self, sizes: &[SizeDefinition]) -> Option<usize> {
        let mut defaults = sizes
            .iter()
            .enumerate()
            .filter(|(_, size)| size.is_default())
            .map(|(i, _)| i);
        match self {
            FallbackPolicy::First => defaults.next(),
            FallbackPolicy::Last => defaults.last(),
        }
    }
}

/// One size × density combination, before it is rendered.
#[derive(Debug, Clone)]
pub struct RenditionRequest<'a> {
    pub size: &'a SizeDefinition,
    pub density: PixelDensity,
    pub crop: Option<CropInstruction>,
    pub special_function: SpecialFunction,
    pub file_extension: Option<&'a str>,
}

impl RenditionRequest<'_> {
    /// `density × width`, rounded to whole pixels.
    pub fn target_width(&self) -> Result<u32, PlanError> {
        let width = self
            .size
            .numeric_width()
            .ok_or_else(|| PlanError::MalformedSizeToken(self.size.image_width().to_string()))?;
        let target = (width * self.density.value()).round();
        if !target.is_finite() || target < 1.0 || target > u32::MAX as f64 {
            return Err(PlanError::DegenerateWidth {
                width: self.size.image_width().to_string(),
                density: self.density,
            });
        }
        Ok(target as u32)
    }

    pub fn instruction(&self) -> Result<RenderInstruction, PlanError> {
        let target = self.target_width()?;
        let resize = match self.special_function {
            SpecialFunction::Square => ResizeMode::ExactCrop {
                width: target,
                height: target,
            },
            SpecialFunction::None => ResizeMode::AspectPreserving { width: target },
        };
        Ok(RenderInstruction {
            resize,
            crop: self.crop,
            file_extension: self.file_extension.map(str::to_string),
        })
    }
}

/// A rendered image together with the request it answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRendition {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size: SizeDefinition,
    pub density: PixelDensity,
}

/// All renditions of one size definition, in density order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenditionGroup {
    pub size: SizeDefinition,
    pub renditions: Vec<ResolvedRendition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenditionPlan {
    pub groups: Vec<RenditionGroup>,
    /// `None` only when no size definition is a default.
    pub fallback: Option<ResolvedRendition>,
}

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub crop: Option<CropInstruction>,
    pub special_function: SpecialFunction,
    pub file_extension: Option<String>,
    /// Ask the renderer for absolute URLs.
    pub absolute_urls: bool,
    pub fallback: FallbackPolicy,
}

struct Job {
    size: usize,
    density: PixelDensity,
    instruction: RenderInstruction,
}

/// Render every rendition of a picture.
pub fn plan_renditions<R: Renderer + ?Sized>(
    renderer: &R,
    source: &SourceImage,
    sizes: &[SizeDefinition],
    densities: &[PixelDensity],
    options: &PlanOptions,
) -> Result<RenditionPlan, PlanError> {
    let max_dimension = renderer.max_dimension();
    let request = |size: &SizeDefinition, density: PixelDensity| -> Result<_, PlanError> {
        let instruction = RenditionRequest {
            size,
            density,
            crop: options.crop,
            special_function: options.special_function,
            file_extension: options.file_extension.as_deref(),
        }
        .instruction()?;
        let width = match instruction.resize {
            ResizeMode::AspectPreserving { width } | ResizeMode::ExactCrop { width, .. } => width,
        };
        match max_dimension {
            Some(max) if width > max => Err(PlanError::WidthTooLarge {
                width: size.image_width().to_string(),
                density,
                max_dimension: max,
            }),
            _ => Ok(instruction),
        }
    };

    let mut jobs = Vec::with_capacity(sizes.len() * densities.len() + 1);
    for (index, size) in sizes.iter().enumerate() {
        if size.numeric_width().is_none() {
            return Err(PlanError::MalformedSizeToken(size.image_width().to_string()));
        }
        for &density in densities {
            jobs.push(Job {
                size: index,
                density,
                instruction: request(size, density)?,
            });
        }
    }
    let fallback_size = options.fallback.select(sizes);
    if let Some(index) = fallback_size {
        jobs.push(Job {
            size: index,
            density: PixelDensity::ONE,
            instruction: request(&sizes[index], PixelDensity::ONE)?,
        });
    }

    log::debug!(
        "planning {} renditions of {}",
        jobs.len(),
        source.path.display()
    );
    let mut rendered = jobs
        .par_iter()
        .map(|job| {
            let image = renderer.render(source, &job.instruction)?;
            let url = if options.absolute_urls {
                renderer.absolute_url(&image.url)
            } else {
                image.url
            };
            Ok(ResolvedRendition {
                url,
                width: image.width,
                height: image.height,
                size: sizes[job.size].clone(),
                density: job.density,
            })
        })
        .collect::<Result<Vec<_>, RenditionFailure>>()?;

    let fallback = match fallback_size {
        Some(_) => rendered.pop(),
        None => None,
    };
    let mut rendered = rendered.into_iter();
    let groups = sizes
        .iter()
        .map(|size| RenditionGroup {
            size: size.clone(),
            renditions: rendered.by_ref().take(densities.len()).collect(),
        })
        .collect();

    Ok(RenditionPlan { groups, fallback })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::{DensityParsing, parse_densities};
    use crate::imaging::CropRect;
    use crate::sizes::parse_sizes;
    use crate::test_helpers::{RecordingRenderer, test_source};

    fn densities(list: &str) -> Vec<PixelDensity> {
        parse_densities(list, DensityParsing::Strict).unwrap()
    }

    fn plan(
        renderer: &RecordingRenderer,
        sizes: &str,
        density_list: &str,
        options: &PlanOptions,
    ) -> Result<RenditionPlan, PlanError> {
        plan_renditions(
            renderer,
            &test_source(1000, 800),
            &parse_sizes(sizes),
            &densities(density_list),
            options,
        )
    }

    // =========================================================================
    // Special function
    // =========================================================================

    #[test]
    fn special_function_parsing() {
        assert_eq!("".parse::<SpecialFunction>(), Ok(SpecialFunction::None));
        assert_eq!(
            "square".parse::<SpecialFunction>(),
            Ok(SpecialFunction::Square)
        );
        assert_eq!(
            "circle".parse::<SpecialFunction>(),
            Err(UnknownSpecialFunction("circle".to_string()))
        );
    }

    // =========================================================================
    // Instructions
    // =========================================================================

    #[test]
    fn square_requests_exact_crop() {
        let size = SizeDefinition::default_size("100");
        let request = RenditionRequest {
            size: &size,
            density: PixelDensity::new(2.0),
            crop: None,
            special_function: SpecialFunction::Square,
            file_extension: None,
        };
        assert_eq!(
            request.instruction().unwrap().resize,
            ResizeMode::ExactCrop {
                width: 200,
                height: 200
            }
        );
    }

    #[test]
    fn normal_requests_aspect_preserving_with_crop_and_extension() {
        let size = SizeDefinition::with_media_condition("(max-width: 414px)", "378");
        let crop = CropRect {
            x: 10,
            y: 20,
            width: 300,
            height: 200,
        };
        let request = RenditionRequest {
            size: &size,
            density: PixelDensity::new(1.5),
            crop: Some(crop),
            special_function: SpecialFunction::None,
            file_extension: Some("webp"),
        };
        let instruction = request.instruction().unwrap();
        assert_eq!(instruction.resize, ResizeMode::AspectPreserving { width: 567 });
        assert_eq!(instruction.crop, Some(crop));
        assert_eq!(instruction.file_extension.as_deref(), Some("webp"));
    }

    #[test]
    fn fractional_targets_are_rounded() {
        let size = SizeDefinition::default_size("333");
        let request = RenditionRequest {
            size: &size,
            density: PixelDensity::new(1.5),
            crop: None,
            special_function: SpecialFunction::None,
            file_extension: None,
        };
        // 499.5 rounds away from zero
        assert_eq!(request.target_width().unwrap(), 500);
    }

    // =========================================================================
    // Planning
    // =========================================================================

    #[test]
    fn groups_follow_size_and_density_order() {
        let renderer = RecordingRenderer::default();
        let plan = plan(
            &renderer,
            "(max-width: 414px) 378px, (max-width: 575px) 540px, 634px",
            "1, 2",
            &PlanOptions::default(),
        )
        .unwrap();

        let widths: Vec<Vec<u32>> = plan
            .groups
            .iter()
            .map(|g| g.renditions.iter().map(|r| r.width).collect())
            .collect();
        assert_eq!(widths, vec![vec![378, 756], vec![540, 1080], vec![634, 1268]]);
        assert_eq!(plan.groups[0].size.media_condition(), "(max-width: 414px)");
        assert_eq!(plan.groups[2].renditions[1].density, PixelDensity::new(2.0));
    }

    #[test]
    fn fallback_is_rendered_at_density_one() {
        let renderer = RecordingRenderer::default();
        let plan = plan(&renderer, "(max-width: 414px) 378px, 634px", "2, 3", &PlanOptions::default())
            .unwrap();

        let fallback = plan.fallback.unwrap();
        assert_eq!(fallback.width, 634);
        assert_eq!(fallback.density, PixelDensity::ONE);
        assert!(fallback.size.is_default());
    }

    #[test]
    fn density_one_in_list_still_requests_separate_fallback() {
        let renderer = RecordingRenderer::default();
        plan(&renderer, "634px", "1, 2", &PlanOptions::default()).unwrap();
        // 1x, 2x and the fallback
        assert_eq!(renderer.calls().len(), 3);
    }

    #[test]
    fn no_default_means_no_fallback() {
        let renderer = RecordingRenderer::default();
        let plan = plan(&renderer, "(max-width: 414px) 378px", "1", &PlanOptions::default())
            .unwrap();
        assert!(plan.fallback.is_none());
        assert_eq!(renderer.calls().len(), 1);
    }

    #[test]
    fn fallback_policy_selects_first_or_last_default() {
        let renderer = RecordingRenderer::default();
        let first = plan(&renderer, "100px, 200px", "1", &PlanOptions::default()).unwrap();
        assert_eq!(first.fallback.unwrap().width, 100);

        let options = PlanOptions {
            fallback: FallbackPolicy::Last,
            ..PlanOptions::default()
        };
        let last = plan(&renderer, "100px, 200px", "1", &options).unwrap();
        assert_eq!(last.fallback.unwrap().width, 200);
    }

    #[test]
    fn empty_density_list_yields_empty_groups() {
        let renderer = RecordingRenderer::default();
        let plan = plan(&renderer, "(min-width: 1px) 300px, 634px", "", &PlanOptions::default())
            .unwrap();
        assert_eq!(plan.groups.len(), 2);
        assert!(plan.groups.iter().all(|g| g.renditions.is_empty()));
        assert_eq!(plan.fallback.unwrap().width, 634);
    }

    #[test]
    fn absolute_urls_go_through_renderer() {
        let renderer = RecordingRenderer::default();
        let options = PlanOptions {
            absolute_urls: true,
            ..PlanOptions::default()
        };
        let plan = plan(&renderer, "634px", "1", &options).unwrap();
        assert!(plan.groups[0].renditions[0]
            .url
            .starts_with("https://example.com/"));
        assert!(plan.fallback.unwrap().url.starts_with("https://example.com/"));
    }

    #[test]
    fn malformed_width_fails_before_rendering() {
        let renderer = RecordingRenderer::default();
        let result = plan(&renderer, "(max-width: 414px) 50vw, 634px", "1", &PlanOptions::default());
        assert!(matches!(result, Err(PlanError::MalformedSizeToken(t)) if t == "50vw"));
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn empty_sizes_string_is_malformed() {
        let renderer = RecordingRenderer::default();
        let result = plan(&renderer, "", "", &PlanOptions::default());
        assert!(matches!(result, Err(PlanError::MalformedSizeToken(t)) if t.is_empty()));
    }

    #[test]
    fn zero_width_is_degenerate() {
        let renderer = RecordingRenderer::default();
        let result = plan(&renderer, "0px", "1", &PlanOptions::default());
        assert!(matches!(result, Err(PlanError::DegenerateWidth { .. })));
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn width_beyond_renderer_limit_fails_before_rendering() {
        let renderer = RecordingRenderer::with_max_dimension(16_384);
        let result = plan(&renderer, "300px, 4000000000px", "1", &PlanOptions::default());
        assert!(matches!(
            result,
            Err(PlanError::WidthTooLarge { width, max_dimension: 16_384, .. }) if width == "4000000000"
        ));
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn density_can_push_width_beyond_limit() {
        let renderer = RecordingRenderer::with_max_dimension(1000);
        assert!(plan(&renderer, "500px", "2", &PlanOptions::default()).is_ok());
        let result = plan(&renderer, "500px", "1, 3", &PlanOptions::default());
        assert!(matches!(
            result,
            Err(PlanError::WidthTooLarge { density, .. }) if density == PixelDensity::new(3.0)
        ));
    }

    #[test]
    fn renderer_failure_aborts_plan() {
        let renderer = RecordingRenderer::failing_at_width(756);
        let result = plan(
            &renderer,
            "(max-width: 414px) 378px, 634px",
            "1, 2",
            &PlanOptions::default(),
        );
        assert!(matches!(
            result,
            Err(PlanError::Rendition(RenditionFailure::MissingFile(_)))
        ));
    }

    #[test]
    fn planning_is_idempotent() {
        let renderer = RecordingRenderer::default();
        let options = PlanOptions {
            special_function: SpecialFunction::Square,
            ..PlanOptions::default()
        };
        let sizes = "(max-width: 575px) 540px, 634px";
        assert_eq!(
            plan(&renderer, sizes, "1, 1.5, 2", &options).unwrap(),
            plan(&renderer, sizes, "1, 1.5, 2", &options).unwrap()
        );
    }
}
