//! Content-addressed rendition names for incremental rendering.
//!
//! Encoding is the bottleneck of a render call; AVIF in particular can take
//! seconds per rendition. The [`FileRenderer`](crate::render::FileRenderer)
//! therefore names every rendition after *what* it contains, and skips the
//! encode when a file of that name already exists.
//!
//! # Cache keys
//!
//! A rendition file name is `{stem}-{key}.{ext}`, where `key` is the first
//! 16 hex digits of a SHA-256 over:
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout` (which resets
//!   modification times). Computed once per source image and shared across
//!   all of its renditions.
//!
//! - **`params_hash`**: SHA-256 of the render parameters: resize mode and
//!   dimensions, crop rectangle, output format, quality, and upscaling policy.
//!   If any of these change, the name changes and the rendition is re-encoded.
//!
//! Identical instructions always map to the same file, which makes repeated
//! and concurrent calls with the same arguments idempotent.
//!
//! # Bypassing the cache
//!
//! Pass `--no-cache` to the `render` command to force re-encoding. Existing
//! files are overwritten in place.

use crate::render::{RenderInstruction, ResizeMode};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;

/// Hex digits of the combined hash kept in file names.
const KEY_LENGTH: usize = 16;

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of everything that determines the pixels of a rendition.
pub fn hash_render_params(
    instruction: &RenderInstruction,
    extension: &str,
    quality: u32,
    allow_upscaling: bool,
) -> String {
    let mut hasher = Sha256::new();
    match instruction.resize {
        ResizeMode::AspectPreserving { width } => {
            hasher.update(b"resize\0");
            hasher.update(width.to_le_bytes());
        }
        ResizeMode::ExactCrop { width, height } => {
            hasher.update(b"fill\0");
            hasher.update(width.to_le_bytes());
            hasher.update(height.to_le_bytes());
        }
    }
    match instruction.crop {
        Some(crop) => {
            hasher.update(b"\x01");
            for value in [crop.x, crop.y, crop.width, crop.height] {
                hasher.update(value.to_le_bytes());
            }
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(extension.as_bytes());
    hasher.update(b"\0");
    hasher.update(quality.to_le_bytes());
    hasher.update([u8::from(allow_upscaling)]);
    format!("{:x}", hasher.finalize())
}

/// File name of a rendition: `{stem}-{key}.{ext}`.
pub fn rendition_file_name(stem: &str, source_hash: &str, params_hash: &str, ext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_hash.as_bytes());
    hasher.update(b":");
    hasher.update(params_hash.as_bytes());
    let key = format!("{:x}", hasher.finalize());
    format!("{}-{}.{}", stem, &key[..KEY_LENGTH], ext)
}

/// Summary of cache performance for a render call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}
