//! Markup assembly: rendition groups → the structure of a `<picture>`.
//!
//! ```text
//! <picture>
//!   <source media="(max-width: 414px)" srcset="/p/a-378.jpg, /p/a-756.jpg 2x">
//!   <source media="" srcset="/p/a-634.jpg, /p/a-1268.jpg 2x">
//!   <img src="/p/a-634.jpg" width="634" height="507">
//! </picture>
//! ```
//!
//! One source per size definition, in parse order. The media condition is
//! copied verbatim; an empty condition matches unconditionally.

use crate::density::PixelDensity;
use crate::planner::{RenditionGroup, RenditionPlan, ResolvedRendition};
use serde::{Deserialize, Serialize};

/// When a `srcset` entry is written without its `Nx` descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensitySuffix {
    /// Only density `1` is written bare.
    #[default]
    Exact,
    /// Every density in `[1, 2)` is written bare, as older templates did.
    Truncate,
}

impl DensitySuffix {
    /// Whether the descriptor is left out for `density`.
    pub fn omits(self, density: PixelDensity) -> bool {
        match self {
            DensitySuffix::Exact => density.value() == 1.0,
            DensitySuffix::Truncate => density.value().trunc() == 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub media_condition: String,
    pub srcset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackImageDescriptor {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl From<&ResolvedRendition> for FallbackImageDescriptor {
    fn from(rendition: &ResolvedRendition) -> Self {
        Self {
            url: rendition.url.clone(),
            width: rendition.width,
            height: rendition.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PictureMarkupPlan {
    pub sources: Vec<SourceDescriptor>,
    pub fallback: Option<FallbackImageDescriptor>,
}

/// `srcset` value of one group: `"a.jpg, b.jpg 2x"`.
pub fn srcset_line(group: &RenditionGroup, suffix: DensitySuffix) -> String {
    group
        .renditions
        .iter()
        .map(|rendition| {
            if suffix.omits(rendition.density) {
                rendition.url.clone()
            } else {
                format!("{} {}x", rendition.url, rendition.density)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn assemble(plan: &RenditionPlan, suffix: DensitySuffix) -> PictureMarkupPlan {
    PictureMarkupPlan {
        sources: plan
            .groups
            .iter()
            .map(|group| SourceDescriptor {
                media_condition: group.size.media_condition().to_string(),
                srcset: srcset_line(group, suffix),
            })
            .collect(),
        fallback: plan.fallback.as_ref().map(FallbackImageDescriptor::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizes::SizeDefinition;

    fn rendition(url: &str, density: f64, size: &SizeDefinition) -> ResolvedRendition {
        ResolvedRendition {
            url: url.to_string(),
            width: 100,
            height: 80,
            size: size.clone(),
            density: PixelDensity::new(density),
        }
    }

    fn group(size: SizeDefinition, entries: &[(&str, f64)]) -> RenditionGroup {
        RenditionGroup {
            renditions: entries
                .iter()
                .map(|(url, d)| rendition(url, *d, &size))
                .collect(),
            size,
        }
    }

    #[test]
    fn density_one_has_no_suffix() {
        let g = group(
            SizeDefinition::default_size("100"),
            &[("a.jpg", 1.0), ("b.jpg", 2.0)],
        );
        assert_eq!(srcset_line(&g, DensitySuffix::Exact), "a.jpg, b.jpg 2x");
    }

    #[test]
    fn fractional_densities_keep_decimal() {
        let g = group(
            SizeDefinition::default_size("100"),
            &[("a.jpg", 1.5), ("b.jpg", 2.5)],
        );
        assert_eq!(
            srcset_line(&g, DensitySuffix::Exact),
            "a.jpg 1.5x, b.jpg 2.5x"
        );
    }

    #[test]
    fn truncate_policy_omits_densities_below_two() {
        let g = group(
            SizeDefinition::default_size("100"),
            &[("a.jpg", 1.0), ("b.jpg", 1.5), ("c.jpg", 2.0)],
        );
        assert_eq!(
            srcset_line(&g, DensitySuffix::Truncate),
            "a.jpg, b.jpg, c.jpg 2x"
        );
        assert_eq!(
            srcset_line(&g, DensitySuffix::Exact),
            "a.jpg, b.jpg 1.5x, c.jpg 2x"
        );
    }

    #[test]
    fn empty_group_has_empty_srcset() {
        let g = group(SizeDefinition::default_size("100"), &[]);
        assert_eq!(srcset_line(&g, DensitySuffix::Exact), "");
    }

    #[test]
    fn sources_follow_plan_order_and_copy_media() {
        let narrow = SizeDefinition::with_media_condition("(max-width: 414px)", "378");
        let wide = SizeDefinition::default_size("634");
        let fallback = rendition("w1.jpg", 1.0, &wide);
        let plan = RenditionPlan {
            groups: vec![
                group(narrow, &[("n1.jpg", 1.0), ("n2.jpg", 2.0)]),
                group(wide, &[("w1.jpg", 1.0), ("w2.jpg", 2.0)]),
            ],
            fallback: Some(fallback),
        };

        let markup = assemble(&plan, DensitySuffix::default());
        assert_eq!(
            markup.sources,
            vec![
                SourceDescriptor {
                    media_condition: "(max-width: 414px)".to_string(),
                    srcset: "n1.jpg, n2.jpg 2x".to_string(),
                },
                SourceDescriptor {
                    media_condition: String::new(),
                    srcset: "w1.jpg, w2.jpg 2x".to_string(),
                },
            ]
        );
        assert_eq!(
            markup.fallback,
            Some(FallbackImageDescriptor {
                url: "w1.jpg".to_string(),
                width: 100,
                height: 80,
            })
        );
    }

    #[test]
    fn plan_without_fallback() {
        let plan = RenditionPlan {
            groups: vec![],
            fallback: None,
        };
        let markup = assemble(&plan, DensitySuffix::Exact);
        assert!(markup.sources.is_empty());
        assert!(markup.fallback.is_none());
    }
}
