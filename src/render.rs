//! The renderer: turns one resize instruction into a stored image with a
//! public URL.
//!
//! [`Renderer`] is the seam the planner calls through. [`FileRenderer`] is the
//! default implementation: it validates sources against a [`Storage`], runs
//! the pixel work through an [`ImageBackend`], and writes content-addressed
//! files (see [`cache`](crate::cache)) to the storage's output directory.
//!
//! ## Concurrency
//!
//! The planner calls `render` from several rayon workers at once, sometimes
//! with identical instructions (the fallback rendition duplicates the 1x
//! rendition of the default size). Identical instructions share a file name;
//! each encode goes to a private temporary file that is renamed into place,
//! so readers never see a partially written rendition.

use crate::cache::{self, CacheStats};
use crate::crop::CropInstruction;
use crate::imaging::{
    BackendError, DEFAULT_MAX_DIMENSION, Dimensions, FillParams, ImageBackend, Quality,
    ResizeParams, calculate_fill_target, calculate_resize_dimensions, check_output_dimensions,
    clamp_crop,
};
use crate::source::{ImageHandle, SourceImage};
use crate::storage::Storage;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenditionFailure {
    #[error("Source image not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("Source is not a file: {}", .0.display())]
    PathIsNotAFile(PathBuf),
    #[error("Storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Source is outside the storage root: {}", .0.display())]
    InvalidStorageReference(PathBuf),
    #[error("Image processing failed: {0}")]
    Processing(#[from] BackendError),
}

/// How the target size is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Scale to `width`; the height follows the aspect ratio.
    AspectPreserving { width: u32 },
    /// Fill and center-crop to exactly `width × height`.
    ExactCrop { width: u32, height: u32 },
}

/// Everything a renderer needs to produce one rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInstruction {
    pub resize: ResizeMode,
    pub crop: Option<CropInstruction>,
    /// Output format override. `None` keeps the source format.
    pub file_extension: Option<String>,
}

impl RenderInstruction {
    /// Short human label: `756w` or `200x200`.
    pub fn label(&self) -> String {
        match self.resize {
            ResizeMode::AspectPreserving { width } => format!("{}w", width),
            ResizeMode::ExactCrop { width, height } => format!("{}x{}", width, height),
        }
    }
}

/// A stored rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// The external renderer interface.
///
/// Implementations must be safe to call concurrently, including with
/// identical arguments.
pub trait Renderer: Sync {
    /// Validate and identify a source image.
    fn open(&self, handle: &ImageHandle) -> Result<SourceImage, RenditionFailure>;

    /// Produce (or reuse) the rendition described by `instruction`.
    fn render(
        &self,
        source: &SourceImage,
        instruction: &RenderInstruction,
    ) -> Result<RenderedImage, RenditionFailure>;

    /// Absolute form of a public URL. The default leaves it unchanged.
    fn absolute_url(&self, url: &str) -> String {
        url.to_string()
    }

    /// Longest output edge this renderer accepts, if it has a limit.
    fn max_dimension(&self) -> Option<u32> {
        None
    }
}

/// Whether a rendition was reused or freshly written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenditionStatus {
    Cached,
    Encoded,
}

/// Progress events emitted by a [`FileRenderer`].
#[derive(Debug, Clone)]
pub enum RenderEvent {
    SourceOpened {
        path: String,
        width: u32,
        height: u32,
    },
    Rendered(RenditionInfo),
}

#[derive(Debug, Clone)]
pub struct RenditionInfo {
    pub label: String,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub status: RenditionStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub quality: Quality,
    pub allow_upscaling: bool,
    pub use_cache: bool,
    /// Longest edge of any rendition, in pixels.
    pub max_dimension: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            allow_upscaling: true,
            use_cache: true,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Disambiguates temporary files written by concurrent encodes.
static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// [`Renderer`] writing renditions to local [`Storage`].
pub struct FileRenderer<'a, B: ImageBackend> {
    backend: &'a B,
    storage: &'a Storage,
    options: RenderOptions,
    events: Option<Sender<RenderEvent>>,
    stats: Mutex<CacheStats>,
}

impl<'a, B: ImageBackend> FileRenderer<'a, B> {
    pub fn new(backend: &'a B, storage: &'a Storage, options: RenderOptions) -> Self {
        Self {
            backend,
            storage,
            options,
            events: None,
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Report progress as [`RenderEvent`]s on `events`.
    pub fn with_events(mut self, events: Sender<RenderEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Cache hits and misses so far.
    pub fn cache_stats(&self) -> CacheStats {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    fn output_extension(
        &self,
        source: &SourceImage,
        instruction: &RenderInstruction,
    ) -> Result<String, RenditionFailure> {
        let ext = match &instruction.file_extension {
            Some(ext) => ext.trim_start_matches('.').to_lowercase(),
            None => source.extension(),
        };
        if ext.is_empty() {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot determine output format for {}",
                source.path.display()
            ))
            .into());
        }
        Ok(ext)
    }

    /// Dimensions the backend will produce for `instruction`, rejected when
    /// they exceed the size limit.
    fn planned_dimensions(
        &self,
        source: &SourceImage,
        instruction: &RenderInstruction,
    ) -> Result<(u32, u32), BackendError> {
        let dims = source.dimensions;
        let region = clamp_crop((dims.width, dims.height), instruction.crop);
        let region = (region.width, region.height);
        let output = match instruction.resize {
            ResizeMode::AspectPreserving { width } => {
                calculate_resize_dimensions(region, width, self.options.allow_upscaling)
            }
            ResizeMode::ExactCrop { width, height } => {
                calculate_fill_target(region, (width, height), self.options.allow_upscaling)
            }
        };
        check_output_dimensions(output, self.options.max_dimension)?;
        Ok(output)
    }

    /// Run the backend into a temporary file, then move it into place.
    fn encode(
        &self,
        source: &SourceImage,
        instruction: &RenderInstruction,
        output: &Path,
        ext: &str,
    ) -> Result<Dimensions, RenditionFailure> {
        let temp = output.with_file_name(format!(
            ".{}-{}.{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            ext
        ));
        let result = match instruction.resize {
            ResizeMode::AspectPreserving { width } => self.backend.resize(&ResizeParams {
                source: source.path.clone(),
                output: temp.clone(),
                crop: instruction.crop,
                width,
                allow_upscaling: self.options.allow_upscaling,
                quality: self.options.quality,
            }),
            ResizeMode::ExactCrop { width, height } => self.backend.fill(&FillParams {
                source: source.path.clone(),
                output: temp.clone(),
                crop: instruction.crop,
                width,
                height,
                allow_upscaling: self.options.allow_upscaling,
                quality: self.options.quality,
            }),
        };
        let dims = match result {
            Ok(dims) => dims,
            Err(e) => {
                let _ = std::fs::remove_file(&temp);
                return Err(e.into());
            }
        };
        std::fs::rename(&temp, output).map_err(|source| RenditionFailure::StorageUnavailable {
            path: output.to_path_buf(),
            source,
        })?;
        Ok(dims)
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(events) = &self.events {
            // The printer may have gone away; rendering continues regardless.
            events.send(event).ok();
        }
    }

    fn record(&self, info: RenditionInfo) {
        if let Ok(mut stats) = self.stats.lock() {
            match info.status {
                RenditionStatus::Cached => stats.hit(),
                RenditionStatus::Encoded => stats.miss(),
            }
        }
        self.emit(RenderEvent::Rendered(info));
    }
}

impl<B: ImageBackend> Renderer for FileRenderer<'_, B> {
    fn open(&self, handle: &ImageHandle) -> Result<SourceImage, RenditionFailure> {
        let path = self.storage.open(handle)?;
        let dimensions = self.backend.identify(&path)?;
        let content_hash = cache::hash_file(&path).map_err(BackendError::Io)?;
        log::debug!(
            "opened {} ({}x{})",
            path.display(),
            dimensions.width,
            dimensions.height
        );
        self.emit(RenderEvent::SourceOpened {
            path: path.display().to_string(),
            width: dimensions.width,
            height: dimensions.height,
        });
        Ok(SourceImage {
            path,
            dimensions,
            content_hash,
        })
    }

    fn render(
        &self,
        source: &SourceImage,
        instruction: &RenderInstruction,
    ) -> Result<RenderedImage, RenditionFailure> {
        let ext = self.output_extension(source, instruction)?;
        self.planned_dimensions(source, instruction)?;
        let params_hash = cache::hash_render_params(
            instruction,
            &ext,
            self.options.quality.value(),
            self.options.allow_upscaling,
        );
        let file_name =
            cache::rendition_file_name(source.stem(), &source.content_hash, &params_hash, &ext);
        self.storage.prepare_output()?;
        let output = self.storage.output_path(&file_name);

        let (dims, status) = if self.options.use_cache && output.is_file() {
            (self.backend.identify(&output)?, RenditionStatus::Cached)
        } else {
            let dims = self.encode(source, instruction, &output, &ext)?;
            (dims, RenditionStatus::Encoded)
        };
        log::debug!(
            "{} {} -> {} ({:?})",
            source.path.display(),
            instruction.label(),
            file_name,
            status
        );

        let url = self.storage.public_url(&file_name);
        self.record(RenditionInfo {
            label: instruction.label(),
            file_name,
            width: dims.width,
            height: dims.height,
            status,
        });
        Ok(RenderedImage {
            url,
            width: dims.width,
            height: dims.height,
        })
    }

    fn absolute_url(&self, url: &str) -> String {
        self.storage.absolute_url(url)
    }

    fn max_dimension(&self) -> Option<u32> {
        Some(self.options.max_dimension)
    }
}
