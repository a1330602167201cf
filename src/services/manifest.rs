use crate::models::{AssetCategory, AssetEntry, AssetFormat, AssetManifest, AssetsConfig, ViewBox};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use regex::Regex;
use std::fs;
use std::io;
use thiserror::Error;

/// Errors that can occur while generating a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Asset root not found: {0}")]
    RootNotFound(Utf8PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Offline scanner that turns an asset directory into an [`AssetManifest`]
///
/// # Scan rules
///
/// - The first path segment under the root is the category; files outside a
///   recognized category directory are ignored
/// - Any hidden segment (leading `.`) excludes the file
/// - The manifest's own output file is never listed
/// - The lowercased extension must be on the format allow-list
/// - Only regular files count; symlinks and non-UTF-8 names are skipped
///
/// SVG files additionally get their `viewBox` size when it is well-formed.
///
/// Running the scan twice over unchanged files yields the same entries.
pub struct ManifestGenerator {
    root: Utf8PathBuf,
    output: Utf8PathBuf,
    web_prefix: String,

    /// Regex for the `viewBox="..."` attribute value
    view_box_pattern: Regex,
}

impl ManifestGenerator {
    /// Create a generator for `root`, writing to `root/asset-manifest.json`
    pub fn new<P: AsRef<Utf8Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            output: root.join("asset-manifest.json"),
            root,
            web_prefix: "/assets".to_string(),
            view_box_pattern: Regex::new(r#"(?i)viewBox="([^"]+)""#)
                .expect("Invalid viewBox regex"),
        }
    }

    pub fn from_config(config: &AssetsConfig) -> Self {
        Self::new(&config.root)
            .with_output(config.manifest_path())
            .with_web_prefix(&config.web_prefix)
    }

    pub fn with_output<P: AsRef<Utf8Path>>(mut self, output: P) -> Self {
        self.output = output.as_ref().to_path_buf();
        self
    }

    pub fn with_web_prefix(mut self, prefix: &str) -> Self {
        self.web_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn output(&self) -> &Utf8Path {
        &self.output
    }

    /// Scan the root and return entries in directory-walk order
    pub fn collect(&self) -> Result<Vec<AssetEntry>, ManifestError> {
        if !self.root.is_dir() {
            return Err(ManifestError::RootNotFound(self.root.clone()));
        }

        let mut entries = Vec::new();
        self.walk(&self.root, &mut entries)?;
        Ok(entries)
    }

    /// Scan and assemble a sorted, timestamped manifest
    pub fn build(&self) -> Result<AssetManifest, ManifestError> {
        Ok(AssetManifest::new(self.collect()?, Utc::now()))
    }

    /// Write a manifest as pretty JSON with a trailing newline
    pub fn write(&self, manifest: &AssetManifest) -> Result<(), ManifestError> {
        let mut json = serde_json::to_string_pretty(manifest)?;
        json.push('\n');

        if let Some(parent) = self.output.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ManifestError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&self.output, json).map_err(|source| ManifestError::Io {
            path: self.output.clone(),
            source,
        })
    }

    /// Build and write the manifest
    pub fn generate(&self) -> Result<AssetManifest, ManifestError> {
        let manifest = self.build()?;
        self.write(&manifest)?;
        tracing::info!(
            "Asset manifest generated with {} entries at {}",
            manifest.asset_count,
            self.output
        );
        Ok(manifest)
    }

    fn walk(&self, dir: &Utf8Path, entries: &mut Vec<AssetEntry>) -> Result<(), ManifestError> {
        let read_dir = fs::read_dir(dir).map_err(|source| ManifestError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|source| ManifestError::Io {
                path: dir.to_path_buf(),
                source,
            })?;

            let Ok(path) = Utf8PathBuf::try_from(dir_entry.path()) else {
                tracing::debug!("Skipping non-UTF-8 path: {}", dir_entry.path().display());
                continue;
            };

            if path == self.output {
                continue;
            }

            let file_type = dir_entry.file_type().map_err(|source| ManifestError::Io {
                path: path.clone(),
                source,
            })?;

            if file_type.is_dir() {
                self.walk(&path, entries)?;
            } else if file_type.is_file() {
                entries.extend(self.entry_for(&path)?);
            }
        }

        Ok(())
    }

    /// Build the entry for one file, or `None` when the scan rules exclude it
    fn entry_for(&self, path: &Utf8Path) -> Result<Option<AssetEntry>, ManifestError> {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return Ok(None);
        };

        let segments: Vec<&str> = relative.components().map(|c| c.as_str()).collect();
        if segments.iter().any(|s| s.starts_with('.')) {
            return Ok(None);
        }

        // A file directly under the root has no category directory
        if segments.len() < 2 {
            return Ok(None);
        }
        let Some(category) = AssetCategory::from_dir_name(segments[0]) else {
            return Ok(None);
        };

        let Some(format) = path.extension().and_then(AssetFormat::from_extension) else {
            return Ok(None);
        };
        let name = path.file_stem().unwrap_or_default().to_string();

        let metadata = fs::metadata(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let id = segments.join("/");
        let view_box = if format == AssetFormat::Svg {
            let bytes = fs::read(path).map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            self.extract_view_box(&String::from_utf8_lossy(&bytes))
        } else {
            None
        };

        Ok(Some(AssetEntry {
            path: format!("{}/{}", self.web_prefix, id),
            id,
            name,
            category,
            format,
            bytes: metadata.len(),
            preload: category.default_preload(),
            view_box,
        }))
    }

    /// Parse width and height from an SVG `viewBox` attribute.
    ///
    /// The value must split on whitespace into exactly four finite numbers;
    /// anything else yields `None`.
    pub fn extract_view_box(&self, svg: &str) -> Option<ViewBox> {
        let captures = self.view_box_pattern.captures(svg)?;
        let parts: Vec<f64> = captures[1]
            .split_whitespace()
            .map(|part| part.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<_>>>()?;

        match parts.as_slice() {
            [_, _, width, height] => Some(ViewBox {
                width: *width,
                height: *height,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> ManifestGenerator {
        ManifestGenerator::new("assets")
    }

    #[test]
    fn test_extract_view_box() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 120 80"></svg>"#;
        assert_eq!(
            generator().extract_view_box(svg),
            Some(ViewBox {
                width: 120.0,
                height: 80.0
            })
        );
    }

    #[test]
    fn test_extract_view_box_case_insensitive_and_fractional() {
        let svg = r#"<svg VIEWBOX="-4 -4  32.5   16"/>"#;
        assert_eq!(
            generator().extract_view_box(svg),
            Some(ViewBox {
                width: 32.5,
                height: 16.0
            })
        );
    }

    #[test]
    fn test_extract_view_box_missing_or_malformed() {
        let g = generator();
        assert_eq!(g.extract_view_box("<svg width=\"10\"></svg>"), None);
        assert_eq!(g.extract_view_box(r#"<svg viewBox="0 0 120"></svg>"#), None);
        assert_eq!(g.extract_view_box(r#"<svg viewBox="0,0,120,80"></svg>"#), None);
        assert_eq!(g.extract_view_box(r#"<svg viewBox="0 0 wide 80"></svg>"#), None);
        assert_eq!(g.extract_view_box(r#"<svg viewBox="0 0 inf 80"></svg>"#), None);
        assert_eq!(g.extract_view_box(r#"<svg viewBox="0 0 1 2 3"></svg>"#), None);
    }

    #[test]
    fn test_web_prefix_trailing_slash() {
        let g = ManifestGenerator::new("assets").with_web_prefix("/static/");
        assert_eq!(g.web_prefix, "/static");
        assert_eq!(g.output(), "assets/asset-manifest.json");
    }

    #[test]
    fn test_missing_root() {
        let g = ManifestGenerator::new("/definitely/not/here/skeuokit");
        assert!(matches!(g.collect(), Err(ManifestError::RootNotFound(_))));
    }
}
