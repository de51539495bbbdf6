//! Source images: turning the caller's image argument into something the
//! renderer can open.

use crate::imaging::Dimensions;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unresolvable image: {0}")]
pub struct UnresolvableImage(pub String);

/// A reference to a source image that has not been opened yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    path: PathBuf,
}

impl ImageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An opened source image, as reported by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub dimensions: Dimensions,
    /// Hash of the file contents, used to key renditions.
    pub content_hash: String,
}

impl SourceImage {
    /// File name without extension, used as the prefix of rendition names.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image")
    }

    /// Lower-cased file extension, empty when the file has none.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }
}

/// Resolves an opaque image argument to a handle.
pub trait ImageResolver {
    fn resolve(&self, argument: &str) -> Result<ImageHandle, UnresolvableImage>;
}

/// Accepts plain filesystem paths and `file://` URLs.
#[derive(Debug, Default)]
pub struct PathResolver;

impl ImageResolver for PathResolver {
    fn resolve(&self, argument: &str) -> Result<ImageHandle, UnresolvableImage> {
        let argument = argument.trim();
        if argument.is_empty() {
            return Err(UnresolvableImage("missing image".to_string()));
        }
        if let Some(path) = argument.strip_prefix("file://") {
            if path.is_empty() {
                return Err(UnresolvableImage(argument.to_string()));
            }
            return Ok(ImageHandle::new(path));
        }
        if has_url_scheme(argument) {
            return Err(UnresolvableImage(format!(
                "{argument} is not a local file"
            )));
        }
        Ok(ImageHandle::new(argument))
    }
}

/// `scheme://` where scheme is an RFC 3986 scheme name.
fn has_url_scheme(argument: &str) -> bool {
    match argument.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
