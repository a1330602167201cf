//! Where the loader gets bytes from.
//!
//! [`AssetSource`] is the fetch seam of [`AssetLoader`](super::AssetLoader).
//! [`FsAssetSource`] serves web paths (`/assets/icons/wifi.svg`) from an asset
//! directory on disk and keeps force-cache reads in memory.

use crate::metrics::Metrics;
use async_trait::async_trait;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Cache behavior for a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Always read from the source; do not store the result
    NoStore,
    /// Serve from cache when present, store the result otherwise
    ForceCache,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path {0} is outside the asset root")]
    OutsideRoot(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Fetches raw bytes for a web path
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn fetch(&self, path: &str, cache: CacheMode) -> Result<Arc<[u8]>, SourceError>;
}

/// Asset source reading from a directory on disk
///
/// Web paths must start with the configured prefix; the rest is resolved
/// against the root. `..` segments are rejected.
pub struct FsAssetSource {
    root: Utf8PathBuf,
    web_prefix: String,
    cache: Mutex<HashMap<String, Arc<[u8]>>>,
    metrics: Arc<Metrics>,
}

impl FsAssetSource {
    pub fn new<P: AsRef<Utf8Path>>(root: P, web_prefix: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            web_prefix: web_prefix.trim_end_matches('/').to_string(),
            cache: Mutex::default(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Map a web path to a file under the root
    pub fn resolve_path(&self, path: &str) -> Result<Utf8PathBuf, SourceError> {
        let relative = path
            .strip_prefix(&self.web_prefix)
            .filter(|rest| rest.starts_with('/'))
            .ok_or_else(|| SourceError::NotFound(path.to_string()))?;
        let relative = Utf8Path::new(relative.trim_start_matches('/'));

        if relative
            .components()
            .any(|c| !matches!(c, Utf8Component::Normal(_)))
        {
            return Err(SourceError::OutsideRoot(path.to_string()));
        }

        Ok(self.root.join(relative))
    }

    /// Number of cached paths
    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cached(&self, path: &str) -> Option<Arc<[u8]>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn fetch(&self, path: &str, cache: CacheMode) -> Result<Arc<[u8]>, SourceError> {
        if cache == CacheMode::ForceCache {
            if let Some(bytes) = self.cached(path) {
                self.metrics.record_cache_hit();
                return Ok(bytes);
            }
        }

        let file = self.resolve_path(path)?;
        let bytes: Arc<[u8]> = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes.into(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(path.to_string()));
            }
            Err(source) => {
                return Err(SourceError::Io {
                    path: path.to_string(),
                    source,
                });
            }
        };
        tracing::debug!("Read {} bytes for {} from {}", bytes.len(), path, file);

        if cache == CacheMode::ForceCache {
            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(path.to_string(), Arc::clone(&bytes));
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn source_with_file(name: &str, contents: &[u8]) -> (FsAssetSource, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("icons")).unwrap();
        fs::write(root.join("icons").join(name), contents).unwrap();
        (FsAssetSource::new(&root, "/assets/"), temp_dir)
    }

    #[test]
    fn test_resolve_path() {
        let source = FsAssetSource::new("/srv/assets", "/assets");
        assert_eq!(
            source.resolve_path("/assets/icons/wifi.svg").unwrap(),
            "/srv/assets/icons/wifi.svg"
        );
        assert!(matches!(
            source.resolve_path("/assets/../secret"),
            Err(SourceError::OutsideRoot(_))
        ));
        assert!(matches!(
            source.resolve_path("/assetsx/icons/wifi.svg"),
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            source.resolve_path("/elsewhere/wifi.svg"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_force_cache_serves_from_memory() {
        let (source, temp_dir) = source_with_file("tap.svg", b"<svg/>");
        let first = source
            .fetch("/assets/icons/tap.svg", CacheMode::ForceCache)
            .await
            .unwrap();

        // Remove the file; the cached copy must still be served
        fs::remove_file(temp_dir.path().join("icons").join("tap.svg")).unwrap();
        let second = source
            .fetch("/assets/icons/tap.svg", CacheMode::ForceCache)
            .await
            .unwrap();

        assert_eq!(&*first, b"<svg/>");
        assert_eq!(first, second);
        assert_eq!(source.metrics.cache_hits.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_no_store_bypasses_cache() {
        let (source, _temp_dir) = source_with_file("tap.svg", b"<svg/>");
        source
            .fetch("/assets/icons/tap.svg", CacheMode::NoStore)
            .await
            .unwrap();
        assert_eq!(source.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (source, _temp_dir) = source_with_file("tap.svg", b"<svg/>");
        let result = source
            .fetch("/assets/icons/missing.svg", CacheMode::ForceCache)
            .await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_fetch_through_trait_object() {
        let (source, _temp_dir) = source_with_file("wifi.svg", b"<svg/>");
        let metrics = Arc::new(Metrics::new());
        let source: Arc<dyn AssetSource> = Arc::new(source.with_metrics(Arc::clone(&metrics)));

        for _ in 0..3 {
            let bytes = tokio_test::block_on(
                source.fetch("/assets/icons/wifi.svg", CacheMode::ForceCache),
            )
            .unwrap();
            assert_eq!(&*bytes, b"<svg/>");
        }
        assert_eq!(metrics.cache_hits.load(Ordering::Relaxed), 2);
    }
}
