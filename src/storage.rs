//! Local storage: where sources are read from and renditions are written to.
//!
//! All sources must live under the storage root. Renditions go to a single
//! flat output directory and are published under `public_path`:
//!
//! ```text
//! root/
//! ├── photos/dawn.jpg            # source
//! └── processed/                 # output_dir
//!     ├── dawn-3f9a1c0e5b7d2a44.jpg
//!     └── dawn-91be07c4d2f3a815.webp
//! ```
//!
//! with `public_path = "/processed"` the first rendition is served as
//! `/processed/dawn-3f9a1c0e5b7d2a44.jpg`.

use crate::render::RenditionFailure;
use crate::source::ImageHandle;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    output_dir: PathBuf,
    public_path: String,
    site_url: Option<String>,
}

impl Storage {
    /// Storage rooted at `root`. A relative `output_dir` is taken relative to
    /// the root.
    pub fn new(root: impl Into<PathBuf>, output_dir: impl AsRef<Path>) -> Self {
        let root = root.into();
        let output_dir = root.join(output_dir);
        Self {
            root,
            output_dir,
            public_path: "/processed".to_string(),
            site_url: None,
        }
    }

    pub fn with_public_path(mut self, public_path: &str) -> Self {
        self.public_path = public_path.trim_end_matches('/').to_string();
        self
    }

    pub fn with_site_url(mut self, site_url: Option<&str>) -> Self {
        self.site_url = site_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Locate a source file and check that it is a regular file inside the
    /// storage root.
    pub fn open(&self, handle: &ImageHandle) -> Result<PathBuf, RenditionFailure> {
        let path = self.root.join(handle.path());
        if !path.exists() {
            return Err(RenditionFailure::MissingFile(path));
        }
        let root = self
            .root
            .canonicalize()
            .map_err(|source| RenditionFailure::StorageUnavailable {
                path: self.root.clone(),
                source,
            })?;
        let resolved = path
            .canonicalize()
            .map_err(|_| RenditionFailure::MissingFile(path.clone()))?;
        if !resolved.starts_with(&root) {
            return Err(RenditionFailure::InvalidStorageReference(path));
        }
        if !resolved.is_file() {
            return Err(RenditionFailure::PathIsNotAFile(path));
        }
        Ok(resolved)
    }

    /// Create the output directory if needed.
    pub fn prepare_output(&self) -> Result<(), RenditionFailure> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| {
            RenditionFailure::StorageUnavailable {
                path: self.output_dir.clone(),
                source,
            }
        })
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// Site-relative URL of a rendition.
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_path, file_name)
    }

    /// Prefix a site-relative URL with the configured site URL. Without a site
    /// URL, or for URLs that are already absolute, the input is returned as is.
    pub fn absolute_url(&self, url: &str) -> String {
        match &self.site_url {
            Some(site) if !url.contains("://") => {
                format!("{}/{}", site, url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn storage_with_source() -> (TempDir, Storage) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("photos")).unwrap();
        fs::write(tmp.path().join("photos/dawn.jpg"), "jpeg").unwrap();
        let storage = Storage::new(tmp.path(), "processed");
        (tmp, storage)
    }

    #[test]
    fn opens_file_inside_root() {
        let (_tmp, storage) = storage_with_source();
        let path = storage.open(&ImageHandle::new("photos/dawn.jpg")).unwrap();
        assert!(path.ends_with("photos/dawn.jpg"));
    }

    #[test]
    fn absolute_path_inside_root_is_accepted() {
        let (tmp, storage) = storage_with_source();
        let absolute = tmp.path().join("photos/dawn.jpg");
        assert!(storage.open(&ImageHandle::new(absolute)).is_ok());
    }

    #[test]
    fn missing_file() {
        let (_tmp, storage) = storage_with_source();
        let result = storage.open(&ImageHandle::new("photos/nope.jpg"));
        assert!(matches!(result, Err(RenditionFailure::MissingFile(_))));
    }

    #[test]
    fn directory_is_not_a_file() {
        let (_tmp, storage) = storage_with_source();
        let result = storage.open(&ImageHandle::new("photos"));
        assert!(matches!(result, Err(RenditionFailure::PathIsNotAFile(_))));
    }

    #[test]
    fn file_outside_root_is_rejected() {
        let (tmp, _) = storage_with_source();
        let inner = tmp.path().join("site");
        fs::create_dir_all(&inner).unwrap();
        let storage = Storage::new(&inner, "processed");
        let result = storage.open(&ImageHandle::new("../photos/dawn.jpg"));
        assert!(matches!(
            result,
            Err(RenditionFailure::InvalidStorageReference(_))
        ));
    }

    #[test]
    fn prepare_output_creates_directory() {
        let (tmp, storage) = storage_with_source();
        storage.prepare_output().unwrap();
        assert!(tmp.path().join("processed").is_dir());
    }

    #[test]
    fn prepare_output_fails_when_blocked_by_file() {
        let (tmp, _) = storage_with_source();
        fs::write(tmp.path().join("blocked"), "").unwrap();
        let storage = Storage::new(tmp.path(), "blocked/out");
        assert!(matches!(
            storage.prepare_output(),
            Err(RenditionFailure::StorageUnavailable { .. })
        ));
    }

    #[test]
    fn public_urls() {
        let storage = Storage::new("/srv", "processed").with_public_path("/media/");
        assert_eq!(storage.public_url("a.jpg"), "/media/a.jpg");
        // No site URL configured
        assert_eq!(storage.absolute_url("/media/a.jpg"), "/media/a.jpg");

        let storage = storage.with_site_url(Some("https://example.com/"));
        assert_eq!(
            storage.absolute_url("/media/a.jpg"),
            "https://example.com/media/a.jpg"
        );
        assert_eq!(
            storage.absolute_url("https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
    }
}
