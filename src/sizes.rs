//! Parser for the `sizes` specification.
//!
//! The grammar is the one of the HTML `sizes` attribute: a comma-separated
//! list of `[<media-condition> ]<width>[px]` entries.
//!
//! ```text
//! (max-width: 414px) 378px, (max-width: 575px) 540px, 634px
//! └── media condition ─┘ └┘                           └┘ bare width → default
//! ```
//!
//! Parsing never fails. The width token is kept as opaque text; whether it is
//! actually a number is decided when a rendition is planned
//! (see [`crate::planner`]).

use serde::Serialize;

/// One entry of a parsed sizes specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeDefinition {
    media_condition: String,
    image_width: String,
    is_default: bool,
}

impl SizeDefinition {
    /// An entry that applies when `media_condition` matches.
    pub fn with_media_condition(media_condition: &str, image_width: &str) -> Self {
        Self {
            media_condition: media_condition.to_string(),
            image_width: image_width.to_string(),
            is_default: false,
        }
    }

    /// A bare width entry: no media condition, always matches.
    pub fn default_size(image_width: &str) -> Self {
        Self {
            media_condition: String::new(),
            image_width: image_width.to_string(),
            is_default: true,
        }
    }

    /// CSS media condition, empty for the default entry.
    pub fn media_condition(&self) -> &str {
        &self.media_condition
    }

    /// Width token with any `px` suffix removed.
    pub fn image_width(&self) -> &str {
        &self.image_width
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// The width token as a number of CSS pixels.
    ///
    /// Returns `None` for tokens that are not finite, non-negative numbers.
    pub fn numeric_width(&self) -> Option<f64> {
        self.image_width
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite() && *w >= 0.0)
    }
}

/// Parse a sizes specification into ordered size definitions.
///
/// The empty string yields a single default definition with an empty width.
pub fn parse_sizes(sizes: &str) -> Vec<SizeDefinition> {
    sizes.split(',').map(str::trim).map(parse_entry).collect()
}

fn parse_entry(entry: &str) -> SizeDefinition {
    let entry = entry.strip_suffix("px").unwrap_or(entry);
    match entry.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        Some((pos, ws)) => {
            SizeDefinition::with_media_condition(&entry[..pos], &entry[pos + ws.len_utf8()..])
        }
        None => SizeDefinition::default_size(entry),
    }
}
