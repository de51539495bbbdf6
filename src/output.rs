//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. The primary display
//! for every entity (size definition, rendition) is its semantic identity
//! (media condition, target width) with file names shown as secondary
//! context. Rendition files are content-addressed, so the file name alone
//! says little.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Sizes
//! 001 (max-width: 414px) → 378px
//! 002 default → 634px
//!     Fallback
//!
//! Densities
//!     1, 2
//!
//! 5 renditions per picture
//! ```
//!
//! ## Render
//!
//! ```text
//! dawn.jpg (1000x800)
//!     Source: /srv/site/photos/dawn.jpg
//!     378w → dawn-3f9a1c0e5b7d2a44.jpg (378x302): encoded
//!     756w → dawn-91be07c4d2f3a815.jpg (756x605): cached
//!
//! Renditions: 1 cached, 1 encoded (2 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::cache::CacheStats;
use crate::density::PixelDensity;
use crate::render::{RenderEvent, RenditionStatus};
use crate::sizes::SizeDefinition;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Media condition as shown to users; the empty condition reads `default`.
fn media_label(size: &SizeDefinition) -> &str {
    if size.media_condition().is_empty() {
        "default"
    } else {
        size.media_condition()
    }
}

fn status_label(status: RenditionStatus) -> &'static str {
    match status {
        RenditionStatus::Cached => "cached",
        RenditionStatus::Encoded => "encoded",
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format a parsed sizes/densities pair.
///
/// `fallback` is the index of the size definition that supplies the fallback
/// image. Width tokens that are not pixel widths are flagged inline.
pub fn format_check_output(
    sizes: &[SizeDefinition],
    densities: &[PixelDensity],
    fallback: Option<usize>,
) -> Vec<String> {
    let mut lines = vec!["Sizes".to_string()];
    for (i, size) in sizes.iter().enumerate() {
        let width = match size.numeric_width() {
            Some(_) => format!("{}px", size.image_width()),
            None => format!("{:?} (not a pixel width)", size.image_width()),
        };
        lines.push(format!(
            "{} {} → {}",
            format_index(i + 1),
            media_label(size),
            width
        ));
        if fallback == Some(i) {
            lines.push(format!("{}Fallback", indent(1)));
        }
    }

    lines.push(String::new());
    lines.push("Densities".to_string());
    if densities.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    } else {
        let list: Vec<String> = densities.iter().map(|d| d.to_string()).collect();
        lines.push(format!("{}{}", indent(1), list.join(", ")));
    }

    let total = sizes.len() * densities.len() + usize::from(fallback.is_some());
    lines.push(String::new());
    lines.push(format!("{} renditions per picture", total));
    lines
}

pub fn print_check_output(
    sizes: &[SizeDefinition],
    densities: &[PixelDensity],
    fallback: Option<usize>,
) {
    for line in format_check_output(sizes, densities, fallback) {
        println!("{}", line);
    }
}

// ============================================================================
// Render
// ============================================================================

/// Format a single render progress event as display lines.
///
/// Information-first: the source leads with its file name and dimensions, the
/// full path is indented context. Each rendition shows its target, file and
/// cache status.
pub fn format_render_event(event: &RenderEvent) -> Vec<String> {
    match event {
        RenderEvent::SourceOpened {
            path,
            width,
            height,
        } => {
            let file_name = Path::new(path)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone());
            vec![
                format!("{} ({}x{})", file_name, width, height),
                format!("{}Source: {}", indent(1), path),
            ]
        }
        RenderEvent::Rendered(info) => vec![format!(
            "{}{} → {} ({}x{}): {}",
            indent(1),
            info.label,
            info.file_name,
            info.width,
            info.height,
            status_label(info.status)
        )],
    }
}

pub fn format_render_summary(stats: &CacheStats) -> String {
    format!("Renditions: {}", stats)
}

pub fn print_render_event(event: &RenderEvent) {
    for line in format_render_event(event) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::{DensityParsing, parse_densities};
    use crate::render::RenditionInfo;
    use crate::sizes::parse_sizes;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn check_output_lists_sizes_and_fallback() {
        let sizes = parse_sizes("(max-width: 414px) 378px, 634px");
        let densities = parse_densities("1, 2", DensityParsing::Strict).unwrap();
        let lines = format_check_output(&sizes, &densities, Some(1));
        assert_eq!(
            lines,
            vec![
                "Sizes",
                "001 (max-width: 414px) → 378px",
                "002 default → 634px",
                "    Fallback",
                "",
                "Densities",
                "    1, 2",
                "",
                "5 renditions per picture",
            ]
        );
    }

    #[test]
    fn check_output_flags_malformed_width() {
        let sizes = parse_sizes("(max-width: 414px) 50vw");
        let lines = format_check_output(&sizes, &[], None);
        assert_eq!(lines[1], r#"001 (max-width: 414px) → "50vw" (not a pixel width)"#);
        assert!(lines.contains(&"    (none)".to_string()));
        assert_eq!(lines.last().unwrap(), "0 renditions per picture");
    }

    #[test]
    fn render_source_opened() {
        let event = RenderEvent::SourceOpened {
            path: "/srv/site/photos/dawn.jpg".to_string(),
            width: 1000,
            height: 800,
        };
        assert_eq!(
            format_render_event(&event),
            vec!["dawn.jpg (1000x800)", "    Source: /srv/site/photos/dawn.jpg"]
        );
    }

    #[test]
    fn render_rendition_line() {
        let event = RenderEvent::Rendered(RenditionInfo {
            label: "756w".to_string(),
            file_name: "dawn-91be07c4d2f3a815.jpg".to_string(),
            width: 756,
            height: 605,
            status: RenditionStatus::Cached,
        });
        assert_eq!(
            format_render_event(&event),
            vec!["    756w → dawn-91be07c4d2f3a815.jpg (756x605): cached"]
        );
    }

    #[test]
    fn render_summary() {
        let stats = CacheStats { hits: 1, misses: 1 };
        assert_eq!(
            format_render_summary(&stats),
            "Renditions: 1 cached, 1 encoded (2 total)"
        );
    }
}
