//! Asset manifest schema.
//!
//! The recognized categories, the format allow-list and the variant priority
//! order are defined once here and shared by the offline generator
//! ([`crate::services::manifest`]) and the runtime loader
//! ([`crate::services::loader`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Top-level asset directory a file lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Icons,
    Wallpapers,
    Textures,
    Audio,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 4] =
        [Self::Icons, Self::Wallpapers, Self::Textures, Self::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icons => "icons",
            Self::Wallpapers => "wallpapers",
            Self::Textures => "textures",
            Self::Audio => "audio",
        }
    }

    /// Whether entries of this category are preloaded eagerly by default
    pub fn default_preload(&self) -> bool {
        matches!(self, Self::Icons)
    }

    /// Map a directory name to a recognized category
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File format, named by lowercased extension.
///
/// The generator only ever emits the known variants. A manifest produced
/// elsewhere may carry other formats; those are kept as [`AssetFormat::Other`]
/// and sort after every known format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetFormat {
    Webp,
    Svg,
    Png,
    Jpg,
    Jpeg,
    Json,
    Ogg,
    Mp3,
    Wav,
    Other(String),
}

/// Allowed formats, in variant resolution priority order
pub const FORMAT_PRIORITY: [AssetFormat; 9] = [
    AssetFormat::Webp,
    AssetFormat::Svg,
    AssetFormat::Png,
    AssetFormat::Jpg,
    AssetFormat::Jpeg,
    AssetFormat::Json,
    AssetFormat::Ogg,
    AssetFormat::Mp3,
    AssetFormat::Wav,
];

impl AssetFormat {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Webp => "webp",
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Json => "json",
            Self::Ogg => "ogg",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Other(s) => s,
        }
    }

    /// Parse a file extension against the allow-list.
    ///
    /// Case-insensitive; returns `None` for anything not allowed.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match Self::from(ext.to_ascii_lowercase()) {
            Self::Other(_) => None,
            known => Some(known),
        }
    }

    /// Index in [`FORMAT_PRIORITY`], `None` for unknown formats
    pub fn priority(&self) -> Option<usize> {
        FORMAT_PRIORITY.iter().position(|f| f == self)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Formats the loader decodes as images during preload
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Svg | Self::Png | Self::Webp | Self::Jpg | Self::Jpeg)
    }

    /// Raster formats that load into a decoded bitmap
    pub fn is_raster(&self) -> bool {
        matches!(self, Self::Png | Self::Webp | Self::Jpg | Self::Jpeg)
    }
}

impl From<String> for AssetFormat {
    fn from(value: String) -> Self {
        match value.as_str() {
            "webp" => Self::Webp,
            "svg" => Self::Svg,
            "png" => Self::Png,
            "jpg" => Self::Jpg,
            "jpeg" => Self::Jpeg,
            "json" => Self::Json,
            "ogg" => Self::Ogg,
            "mp3" => Self::Mp3,
            "wav" => Self::Wav,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for AssetFormat {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<AssetFormat> for String {
    fn from(value: AssetFormat) -> Self {
        match value {
            AssetFormat::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order two formats for variant lists.
///
/// Known formats follow [`FORMAT_PRIORITY`]; unknown formats come after all
/// known ones and compare lexicographically among themselves.
pub fn compare_format_priority(a: &AssetFormat, b: &AssetFormat) -> Ordering {
    match (a.priority(), b.priority()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.as_str().cmp(b.as_str()),
    }
}

/// Intrinsic SVG size taken from the `viewBox` attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub width: f64,
    pub height: f64,
}

/// One file in the asset manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    /// Path relative to the asset root, `/`-separated
    pub id: String,
    /// File name without extension
    pub name: String,
    pub category: AssetCategory,
    pub format: AssetFormat,
    /// Web path the asset is served from
    pub path: String,
    pub bytes: u64,
    pub preload: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_box: Option<ViewBox>,
}

impl AssetEntry {
    /// Manifest ordering: (category, name, format), lexicographic, then id
    pub fn manifest_order(a: &AssetEntry, b: &AssetEntry) -> Ordering {
        a.category
            .as_str()
            .cmp(b.category.as_str())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.format.as_str().cmp(b.format.as_str()))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// The generated manifest document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    pub generated_at: DateTime<Utc>,
    pub asset_count: usize,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

impl AssetManifest {
    /// Build a manifest from entries, sorting them into manifest order
    pub fn new(mut assets: Vec<AssetEntry>, generated_at: DateTime<Utc>) -> Self {
        assets.sort_by(AssetEntry::manifest_order);
        Self {
            generated_at,
            asset_count: assets.len(),
            assets,
        }
    }
}
