//! # Responsive Picture
//!
//! Plans and renders the image renditions behind a responsive `<picture>`
//! element. Given a CSS `sizes` specification, a list of pixel densities and
//! an optional crop, it produces one rendition per size × density, a fallback
//! image, and the ordered `<source>` / `<img>` structure that references them.
//!
//! # Architecture: One Render Call
//!
//! ```text
//! 1. Parse     sizes, densities        →  SizeDefinition[], PixelDensity[]
//! 2. Plan      size × density × crop   →  RenderInstruction[] → renderer → renditions
//! 3. Assemble  renditions              →  PictureMarkupPlan (sources + fallback)
//! 4. Serialize PictureMarkupPlan       →  <picture> (maud)
//! ```
//!
//! Parsing never touches the filesystem and never fails on sizes. Everything
//! from image resolution onwards is fail-fast: the first error ends the call,
//! and no partial picture is produced.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sizes`] | `sizes` string parser: media condition + width per entry |
//! | [`density`] | Pixel-density list parser with strict and lenient modes |
//! | [`planner`] | Resize instructions per size × density, parallel rendering, fallback selection |
//! | [`markup`] | Source ordering, `srcset` lines, fallback descriptor |
//! | [`picture`] | The render call: argument checks, resolution, crop, plan, assembly |
//! | [`html`] | Maud serializer for the final `<picture>` element |
//! | [`render`] | [`render::Renderer`] seam and the file-backed [`render::FileRenderer`] |
//! | [`source`] | Image argument resolution (paths, `file://` URLs) |
//! | [`crop`] | JSON crop variants: crop area and focus area |
//! | [`storage`] | Storage root, output directory, public URLs |
//! | [`cache`] | Content-addressed rendition names and cache statistics |
//! | [`imaging`] | Pure-Rust image operations: identify, resize, fill |
//! | [`config`] | `picture.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Renderer as a Trait
//!
//! The planner knows nothing about files. It hands a [`render::RenderInstruction`]
//! (an aspect-preserving resize or an exact crop, never a width string with a
//! mode suffix) to a [`render::Renderer`] and gets back a URL and dimensions.
//! Tests plug in a recording renderer; the CLI plugs in the file renderer over
//! the pure-Rust [`imaging`] backend.
//!
//! ## Policies Instead of Accidents
//!
//! Three behaviours that older `<picture>` helpers got implicitly are explicit
//! `[srcset]` settings in `picture.toml`:
//!
//! - **`density_suffix`**: whether only density `1` or every density in
//!   `[1, 2)` is written without an `x` descriptor.
//! - **`fallback`**: which bare width supplies the fallback when the sizes
//!   string has several.
//! - **`density_parsing`**: whether `"1, two"` is an error or reads as `1, 0`.
//!
//! ## Content-Addressed Renditions
//!
//! Rendition files are named after a hash of the source contents and the
//! render parameters. Identical requests, within one call or across runs,
//! resolve to the same file, so renders are incremental and concurrent
//! duplicate requests are harmless.

pub mod cache;
pub mod config;
pub mod crop;
pub mod density;
pub mod html;
pub mod imaging;
pub mod markup;
pub mod output;
pub mod picture;
pub mod planner;
pub mod render;
pub mod sizes;
pub mod source;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;
