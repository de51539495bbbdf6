//! Configuration module.
//!
//! Handles loading, validating, and merging `picture.toml`. Stock defaults are
//! overridden by the user's config file, which only needs the keys it wants
//! to change.
//!
//! ## Config File Location
//!
//! `picture.toml` in the storage root, or any file passed with `--config`:
//!
//! ```text
//! site/
//! ├── picture.toml             # Overrides stock defaults
//! ├── photos/
//! │   └── dawn.jpg
//! └── processed/               # Renditions (output.dir)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! quality = 90              # Lossy encoding quality (1-100)
//! file_extensions = ["jpg", "jpeg", "png", "webp", "avif"]
//! allow_upscaling = true    # Renditions may be larger than the source
//! max_dimension = 16384     # Longest edge of any rendition, in pixels
//!
//! [output]
//! dir = "processed"         # Rendition directory, relative to the root
//! public_path = "/processed"
//! # site_url = "https://example.com"
//!
//! [srcset]
//! density_suffix = "exact"  # or "truncate"
//! fallback = "first"        # or "last"
//! density_parsing = "strict" # or "lenient"
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::density::DensityParsing;
use crate::imaging::{DEFAULT_MAX_DIMENSION, Quality, supported_output_extensions};
use crate::markup::DensitySuffix;
use crate::picture::SrcsetPolicy;
use crate::planner::FallbackPolicy;
use crate::render::RenderOptions;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the storage root.
pub const CONFIG_FILE_NAME: &str = "picture.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `picture.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PictureConfig {
    /// Encoding and output format settings.
    pub images: ImagesConfig,
    /// Where renditions are written and how they are addressed.
    pub output: OutputConfig,
    /// `srcset` and fallback policies.
    pub srcset: SrcsetConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PictureConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "images.max_dimension must be at least 1".into(),
            ));
        }
        if self.images.file_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "images.file_extensions must not be empty".into(),
            ));
        }
        let supported = supported_output_extensions();
        if let Some(ext) = self
            .images
            .file_extensions
            .iter()
            .find(|ext| !supported.contains(&ext.to_lowercase().as_str()))
        {
            return Err(ConfigError::Validation(format!(
                "images.file_extensions: cannot encode {:?} (supported: {})",
                ext,
                supported.join(", ")
            )));
        }
        if self.output.dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output.dir must not be empty".into(),
            ));
        }
        if !self.output.public_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "output.public_path must start with '/'".into(),
            ));
        }
        if let Some(url) = &self.output.site_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(
                    "output.site_url must be an http(s) URL".into(),
                ));
            }
        }
        Ok(())
    }

    /// Point renditions at `dir` instead of `output.dir`.
    ///
    /// When `output.public_path` still mirrors the old directory (as the stock
    /// `processed` → `/processed` does), it follows the new one. A public path
    /// configured independently, or an absolute `dir`, leaves it unchanged.
    pub fn override_output_dir(&mut self, dir: &str) {
        let follows_dir = mirrored_public_path(&self.output.dir)
            .is_some_and(|mirrored| mirrored == self.output.public_path);
        self.output.dir = dir.to_string();
        if follows_dir {
            match mirrored_public_path(dir) {
                Some(public_path) => self.output.public_path = public_path,
                None => log::warn!(
                    "output dir {} is absolute; URLs keep public path {}",
                    dir,
                    self.output.public_path
                ),
            }
        }
    }

    /// Whether `ext` is in the `images.file_extensions` allow-list.
    pub fn allows_extension(&self, ext: &str) -> bool {
        self.images
            .file_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }

    pub fn srcset_policy(&self) -> SrcsetPolicy {
        SrcsetPolicy {
            density_parsing: self.srcset.density_parsing,
            density_suffix: self.srcset.density_suffix,
            fallback: self.srcset.fallback,
        }
    }

    pub fn render_options(&self, use_cache: bool) -> RenderOptions {
        RenderOptions {
            quality: Quality::new(self.images.quality),
            allow_upscaling: self.images.allow_upscaling,
            use_cache,
            max_dimension: self.images.max_dimension,
        }
    }

    /// Storage rooted at `root` with the configured output settings.
    pub fn storage(&self, root: &Path) -> Storage {
        Storage::new(root, &self.output.dir)
            .with_public_path(&self.output.public_path)
            .with_site_url(self.output.site_url.as_deref())
    }
}

/// Encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Extensions accepted as output format override.
    pub file_extensions: Vec<String>,
    /// Allow renditions larger than the (cropped) source.
    pub allow_upscaling: bool,
    /// Longest edge of any rendition, in pixels.
    pub max_dimension: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            file_extensions: supported_output_extensions()
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            allow_upscaling: true,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Rendition output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Rendition directory, relative to the storage root.
    pub dir: String,
    /// URL path under which `dir` is served.
    pub public_path: String,
    /// Prefix for absolute URLs. Without it absolute URLs stay site-relative.
    pub site_url: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "processed".to_string(),
            public_path: "/processed".to_string(),
            site_url: None,
        }
    }
}

/// `srcset` policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SrcsetConfig {
    /// Which densities are written without an `x` descriptor.
    pub density_suffix: DensitySuffix,
    /// Which bare width supplies the fallback when there are several.
    pub fallback: FallbackPolicy,
    /// Whether malformed densities are errors or read as numbers loosely.
    pub density_parsing: DensityParsing,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel rendition workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// `/{dir}` for a relative output directory, `None` for an absolute one.
fn mirrored_public_path(dir: &str) -> Option<String> {
    if Path::new(dir).is_absolute() {
        return None;
    }
    let relative = dir.trim_start_matches("./").trim_matches('/');
    Some(format!("/{}", relative))
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PictureConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PictureConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PictureConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<PictureConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `picture.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Responsive Picture Configuration
# ================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[images]
# Lossy encoding quality (1 = worst, 100 = best). Used for JPEG and AVIF.
quality = 90

# Extensions accepted by --file-extension. Every entry must be a format the
# encoder can write: jpg, jpeg, png, webp, avif.
file_extensions = ["jpg", "jpeg", "png", "webp", "avif"]

# Allow renditions larger than the (cropped) source image.
allow_upscaling = true

# Longest edge of any rendition, in pixels. Larger requests fail the render
# call before anything is encoded.
max_dimension = 16384

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Directory renditions are written to, relative to the root.
dir = "processed"

# URL path the output directory is served under.
public_path = "/processed"

# Prefix for absolute URLs (--absolute). Without it URLs stay site-relative.
# site_url = "https://example.com"

# ---------------------------------------------------------------------------
# srcset
# ---------------------------------------------------------------------------
[srcset]
# Which densities are written without an "x" descriptor.
#   "exact"    - only 1
#   "truncate" - everything from 1 up to (not including) 2
density_suffix = "exact"

# Which bare width supplies the fallback <img> when there are several.
fallback = "first"

# How malformed densities are handled.
#   "strict"  - reject the render call
#   "lenient" - use the leading number, drop entries without a positive one
density_parsing = "strict"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel rendition workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
