use crate::metrics::Metrics;
use crate::models::{
    AssetCategory, AssetEntry, AssetFormat, AssetManifest, compare_format_priority,
};
use crate::services::source::{AssetSource, CacheMode, SourceError};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use image::DynamicImage;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Default web path of the manifest
pub const DEFAULT_MANIFEST_URL: &str = "/assets/asset-manifest.json";

/// Errors that can occur while loading assets
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load asset manifest {url}: {source}")]
    ManifestFetch {
        url: String,
        #[source]
        source: SourceError,
    },

    #[error("Failed to parse asset manifest {url}: {source}")]
    ManifestParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Failed to decode image {id}: {reason}")]
    ImageDecode { id: String, reason: String },

    #[error("Failed to fetch asset {id}: {source}")]
    Fetch {
        id: String,
        #[source]
        source: SourceError,
    },

    #[error("Asset {id} is not valid UTF-8 text")]
    InvalidText { id: String },

    #[error("Asset {id} is not valid JSON: {source}")]
    InvalidJson {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A manifest entry plus its runtime preload state
///
/// The same `Arc<AssetRecord>` sits in both the id index and the name index,
/// so marking it preloaded is visible through either lookup.
#[derive(Debug)]
pub struct AssetRecord {
    pub entry: AssetEntry,
    preloaded: AtomicBool,
}

impl AssetRecord {
    pub fn new(entry: AssetEntry) -> Self {
        Self {
            entry,
            preloaded: AtomicBool::new(false),
        }
    }

    pub fn is_preloaded(&self) -> bool {
        self.preloaded.load(Ordering::Acquire)
    }

    fn mark_preloaded(&self) {
        self.preloaded.store(true, Ordering::Release);
    }
}

/// Lookup options for [`AssetLoader::resolve`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOptions {
    /// Exact format wanted, if available
    pub format: Option<AssetFormat>,
    /// Formats to try in order when `format` is absent or unavailable
    pub prefer_formats: Vec<AssetFormat>,
    /// Look up by id instead of by the key
    pub id: Option<String>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: AssetFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn prefer<I>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = AssetFormat>,
    {
        self.prefer_formats = formats.into_iter().collect();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Options for [`AssetLoader::load`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    pub resolve: ResolveOptions,
    /// Preload before loading even if the entry does not ask for it
    pub preload: bool,
}

/// What [`AssetLoader::load`] hands back, by format
#[derive(Debug, Clone)]
pub enum AssetPayload {
    /// SVG markup
    Text(String),
    /// Decoded raster image
    Image(DynamicImage),
    Json(serde_json::Value),
    /// Formats the loader does not decode (audio); the web path to hand to a player
    Path(String),
}

/// One failed preload inside a category batch
#[derive(Debug)]
pub struct PreloadFailure {
    pub id: String,
    pub error: LoaderError,
}

/// Outcome of [`AssetLoader::preload_category`]
#[derive(Debug)]
pub struct PreloadReport {
    /// Every entry of the category, in manifest order
    pub assets: Vec<Arc<AssetRecord>>,
    pub failures: Vec<PreloadFailure>,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The two lookup indexes built from one manifest
#[derive(Debug)]
struct AssetIndex {
    generated_at: DateTime<Utc>,
    by_id: IndexMap<String, Arc<AssetRecord>>,
    /// Variants per name, in format priority order
    by_name: HashMap<String, Vec<Arc<AssetRecord>>>,
}

impl AssetIndex {
    fn from_manifest(manifest: AssetManifest) -> Self {
        let mut by_id: IndexMap<String, Arc<AssetRecord>> = IndexMap::new();
        let mut by_name: HashMap<String, Vec<Arc<AssetRecord>>> = HashMap::new();

        for entry in manifest.assets {
            if by_id.contains_key(&entry.id) {
                tracing::warn!("Duplicate asset id {} in manifest, keeping the first", entry.id);
                continue;
            }
            if !entry.format.is_known() {
                tracing::debug!("Asset {} has unrecognized format {}", entry.id, entry.format);
            }

            let record = Arc::new(AssetRecord::new(entry));
            by_name
                .entry(record.entry.name.clone())
                .or_default()
                .push(Arc::clone(&record));
            by_id.insert(record.entry.id.clone(), record);
        }

        for variants in by_name.values_mut() {
            variants.sort_by(|a, b| compare_format_priority(&a.entry.format, &b.entry.format));
        }

        Self {
            generated_at: manifest.generated_at,
            by_id,
            by_name,
        }
    }
}

/// Pick a variant: exact format, then preferred formats in order, then the
/// highest-priority variant
fn select_variant(
    variants: &[Arc<AssetRecord>],
    format: Option<&AssetFormat>,
    prefer_formats: &[AssetFormat],
) -> Option<Arc<AssetRecord>> {
    let find = |wanted: &AssetFormat| variants.iter().find(|r| &r.entry.format == wanted);

    format
        .and_then(find)
        .or_else(|| prefer_formats.iter().find_map(find))
        .or_else(|| variants.first())
        .cloned()
}

/// Runtime asset loader
///
/// Fetches the manifest once, indexes it by id and by name, and resolves,
/// preloads and loads assets through an [`AssetSource`].
///
/// # Initialization
///
/// Every public operation awaits initialization first. The index lives in a
/// [`OnceCell`]: while one caller is fetching the manifest, concurrent callers
/// wait on that same attempt instead of issuing their own fetch. A failed
/// attempt leaves the cell empty and returns the error; the next caller
/// retries.
pub struct AssetLoader {
    manifest_url: String,
    source: Arc<dyn AssetSource>,
    index: OnceCell<AssetIndex>,
    metrics: Arc<Metrics>,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self::with_manifest_url(source, DEFAULT_MANIFEST_URL)
    }

    pub fn with_manifest_url(
        source: Arc<dyn AssetSource>,
        manifest_url: impl Into<String>,
    ) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            source,
            index: OnceCell::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn is_initialized(&self) -> bool {
        self.index.initialized()
    }

    /// Fetch and index the manifest unless that already happened
    pub async fn ensure_initialized(&self) -> Result<(), LoaderError> {
        self.index().await.map(|_| ())
    }

    async fn index(&self) -> Result<&AssetIndex, LoaderError> {
        self.index.get_or_try_init(|| self.fetch_index()).await
    }

    async fn fetch_index(&self) -> Result<AssetIndex, LoaderError> {
        self.metrics.record_manifest_fetch();
        tracing::debug!("Fetching asset manifest from {}", self.manifest_url);

        let bytes = self
            .source
            .fetch(&self.manifest_url, CacheMode::NoStore)
            .await
            .map_err(|source| LoaderError::ManifestFetch {
                url: self.manifest_url.clone(),
                source,
            })?;

        let manifest: AssetManifest =
            serde_json::from_slice(&bytes).map_err(|source| LoaderError::ManifestParse {
                url: self.manifest_url.clone(),
                source,
            })?;

        if manifest.asset_count != manifest.assets.len() {
            tracing::warn!(
                "Manifest declares {} assets but lists {}",
                manifest.asset_count,
                manifest.assets.len()
            );
        }

        let index = AssetIndex::from_manifest(manifest);
        tracing::info!(
            "Asset manifest loaded: {} assets, {} names",
            index.by_id.len(),
            index.by_name.len()
        );
        Ok(index)
    }

    /// Generation time recorded in the manifest
    pub async fn manifest_generated_at(&self) -> Result<DateTime<Utc>, LoaderError> {
        Ok(self.index().await?.generated_at)
    }

    /// Find an entry by name or id.
    ///
    /// An explicit `options.id` wins; a key containing `/` is treated as an id;
    /// anything else is a name, resolved to a variant by
    /// exact format, then `prefer_formats` in order, then format priority.
    pub async fn resolve(
        &self,
        key: &str,
        options: &ResolveOptions,
    ) -> Result<Option<Arc<AssetRecord>>, LoaderError> {
        let index = self.index().await?;

        if let Some(id) = &options.id {
            return Ok(index.by_id.get(id).cloned());
        }
        if key.contains('/') {
            return Ok(index.by_id.get(key).cloned());
        }

        Ok(index.by_name.get(key).and_then(|variants| {
            select_variant(variants, options.format.as_ref(), &options.prefer_formats)
        }))
    }

    /// All variants of a name, in format priority order
    pub async fn variants(&self, name: &str) -> Result<Vec<Arc<AssetRecord>>, LoaderError> {
        let index = self.index().await?;
        Ok(index.by_name.get(name).cloned().unwrap_or_default())
    }

    /// All entries of a category, in manifest order
    pub async fn list_by_category(
        &self,
        category: AssetCategory,
    ) -> Result<Vec<Arc<AssetRecord>>, LoaderError> {
        let index = self.index().await?;
        Ok(index
            .by_id
            .values()
            .filter(|r| r.entry.category == category)
            .cloned()
            .collect())
    }

    /// Fetch and decode an asset ahead of first use.
    ///
    /// Image formats are decoded; audio entries are fetched into the source
    /// cache; anything else is left alone. Already-preloaded records return
    /// immediately. On failure the record stays not preloaded and a later call
    /// may retry.
    pub async fn preload(&self, record: &AssetRecord) -> Result<(), LoaderError> {
        if record.is_preloaded() {
            return Ok(());
        }

        let entry = &record.entry;
        let result = if entry.format.is_image() {
            self.decode_image_entry(entry).await.map(|_| ())
        } else if entry.category == AssetCategory::Audio {
            self.fetch_entry(entry).await.map(|_| ())
        } else {
            return Ok(());
        };

        match result {
            Ok(()) => {
                record.mark_preloaded();
                self.metrics.record_preload();
                tracing::debug!("Preloaded {}", entry.id);
                Ok(())
            }
            Err(e) => {
                self.metrics.record_preload_failure();
                Err(e)
            }
        }
    }

    /// Resolve an asset and return its content.
    ///
    /// Preloads first when the entry's `preload` flag or `options.preload` is
    /// set and the entry is not preloaded yet.
    pub async fn load(
        &self,
        key: &str,
        options: &LoadOptions,
    ) -> Result<AssetPayload, LoaderError> {
        let record = self
            .resolve(key, &options.resolve)
            .await?
            .ok_or_else(|| {
                LoaderError::NotFound(
                    options
                        .resolve
                        .id
                        .clone()
                        .unwrap_or_else(|| key.to_string()),
                )
            })?;

        if !record.is_preloaded() && (record.entry.preload || options.preload) {
            self.preload(&record).await?;
        }

        let entry = &record.entry;
        match &entry.format {
            AssetFormat::Svg => {
                let bytes = self.fetch_entry(entry).await?;
                String::from_utf8(bytes.to_vec())
                    .map(AssetPayload::Text)
                    .map_err(|_| LoaderError::InvalidText {
                        id: entry.id.clone(),
                    })
            }
            format if format.is_raster() => {
                self.decode_image_entry(entry).await.map(|image| {
                    AssetPayload::Image(image.unwrap_or_default())
                })
            }
            AssetFormat::Json => {
                let bytes = self.fetch_entry(entry).await?;
                serde_json::from_slice(&bytes)
                    .map(AssetPayload::Json)
                    .map_err(|source| LoaderError::InvalidJson {
                        id: entry.id.clone(),
                        source,
                    })
            }
            _ => Ok(AssetPayload::Path(entry.path.clone())),
        }
    }

    /// Preload every entry of a category concurrently.
    ///
    /// Individual failures do not stop the batch: every entry is attempted, and
    /// the report lists all entries plus each failure. Only an initialization
    /// error fails the call as a whole.
    pub async fn preload_category(
        &self,
        category: AssetCategory,
    ) -> Result<PreloadReport, LoaderError> {
        let assets = self.list_by_category(category).await?;
        let results = join_all(assets.iter().map(|record| self.preload(record))).await;

        let failures: Vec<PreloadFailure> = assets
            .iter()
            .zip(results)
            .filter_map(|(record, result)| {
                result.err().map(|error| PreloadFailure {
                    id: record.entry.id.clone(),
                    error,
                })
            })
            .collect();

        for failure in &failures {
            tracing::warn!("Preload failed for {}: {}", failure.id, failure.error);
        }
        tracing::info!(
            "Preloaded category {}: {} assets, {} failures",
            category,
            assets.len(),
            failures.len()
        );

        Ok(PreloadReport { assets, failures })
    }

    async fn fetch_entry(&self, entry: &AssetEntry) -> Result<Arc<[u8]>, LoaderError> {
        self.source
            .fetch(&entry.path, CacheMode::ForceCache)
            .await
            .map_err(|source| LoaderError::Fetch {
                id: entry.id.clone(),
                source,
            })
    }

    /// Fetch and decode an image entry. SVGs are checked for markup and yield
    /// `None`; raster formats yield the decoded bitmap. Any failure, fetch or
    /// decode, is an image decode error.
    async fn decode_image_entry(
        &self,
        entry: &AssetEntry,
    ) -> Result<Option<DynamicImage>, LoaderError> {
        let decode_error = |reason: String| LoaderError::ImageDecode {
            id: entry.id.clone(),
            reason,
        };

        let bytes = self
            .source
            .fetch(&entry.path, CacheMode::ForceCache)
            .await
            .map_err(|e| decode_error(e.to_string()))?;

        if entry.format == AssetFormat::Svg {
            let text = std::str::from_utf8(&bytes)
                .map_err(|_| decode_error("SVG is not valid UTF-8".to_string()))?;
            if !text.contains("<svg") {
                return Err(decode_error("no <svg> element".to_string()));
            }
            return Ok(None);
        }

        image::load_from_memory(&bytes)
            .map(Some)
            .map_err(|e| decode_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViewBox;

    fn entry(id: &str, format: &str) -> AssetEntry {
        let (dir, file) = id.split_once('/').unwrap();
        let category = AssetCategory::from_dir_name(dir).unwrap();
        AssetEntry {
            id: id.to_string(),
            name: file.rsplit_once('.').map(|(n, _)| n).unwrap_or(file).to_string(),
            category,
            format: AssetFormat::from(format),
            path: format!("/assets/{id}"),
            bytes: 0,
            preload: category.default_preload(),
            view_box: None,
        }
    }

    fn records(entries: &[AssetEntry]) -> Vec<Arc<AssetRecord>> {
        let index = AssetIndex::from_manifest(AssetManifest::new(entries.to_vec(), Utc::now()));
        index.by_name.values().next().cloned().unwrap()
    }

    #[test]
    fn test_variants_sorted_by_priority() {
        let variants = records(&[
            entry("icons/wifi.png", "png"),
            entry("icons/wifi.heic", "heic"),
            entry("icons/wifi.svg", "svg"),
            entry("icons/wifi.webp", "webp"),
        ]);

        let formats: Vec<&str> = variants.iter().map(|r| r.entry.format.as_str()).collect();
        assert_eq!(formats, vec!["webp", "svg", "png", "heic"]);
    }

    #[test]
    fn test_select_variant_order() {
        let variants = records(&[
            entry("icons/wifi.png", "png"),
            entry("icons/wifi.svg", "svg"),
        ]);

        // Exact format wins
        let exact = select_variant(&variants, Some(&AssetFormat::Png), &[AssetFormat::Svg]);
        assert_eq!(exact.unwrap().entry.format, AssetFormat::Png);

        // Missing exact format falls through to preferences
        let preferred = select_variant(
            &variants,
            Some(&AssetFormat::Webp),
            &[AssetFormat::Jpg, AssetFormat::Png],
        );
        assert_eq!(preferred.unwrap().entry.format, AssetFormat::Png);

        // Nothing matches: highest priority variant
        let fallback = select_variant(&variants, None, &[AssetFormat::Wav]);
        assert_eq!(fallback.unwrap().entry.format, AssetFormat::Svg);

        assert!(select_variant(&[], None, &[]).is_none());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut first = entry("icons/wifi.svg", "svg");
        first.view_box = Some(ViewBox {
            width: 1.0,
            height: 1.0,
        });
        let second = entry("icons/wifi.svg", "svg");

        let index = AssetIndex::from_manifest(AssetManifest {
            generated_at: Utc::now(),
            asset_count: 2,
            assets: vec![first, second],
        });

        assert_eq!(index.by_id.len(), 1);
        assert_eq!(index.by_name["wifi"].len(), 1);
        assert!(index.by_id["icons/wifi.svg"].entry.view_box.is_some());
    }

    #[test]
    fn test_resolve_options_builder() {
        let options = ResolveOptions::new()
            .format(AssetFormat::Png)
            .prefer([AssetFormat::Webp, AssetFormat::Svg])
            .id("icons/wifi.png");

        assert_eq!(options.format, Some(AssetFormat::Png));
        assert_eq!(options.prefer_formats.len(), 2);
        assert_eq!(options.id.as_deref(), Some("icons/wifi.png"));
    }
}
