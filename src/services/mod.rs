//! Services module - asset tooling and sound output.
//!
//! The services here have no knowledge of any view layer. They take their
//! collaborators (asset source, settings store, audio sink) as explicit
//! constructor arguments, so each can be exercised against fakes.
//!
//! # Components
//!
//! - [`ManifestGenerator`]: offline scan of an asset directory into an
//!   [`AssetManifest`](crate::models::AssetManifest), written as JSON next to
//!   the assets
//! - [`AssetLoader`]: runtime index over a fetched manifest. Handles:
//!   - one manifest fetch no matter how many callers race to initialize
//!   - lookup by id or by name with format preferences
//!   - preloading single assets or whole categories
//!   - loading SVG text, decoded rasters and JSON
//! - [`AssetSource`]: the byte fetch seam of the loader, with
//!   [`FsAssetSource`] serving web paths from disk
//! - [`SoundManager`]: short synthesized UI cues gated by the sound and
//!   do-not-disturb settings
//!
//! # Usage Example
//!
//! ```ignore
//! use skeuokit::services::{AssetLoader, FsAssetSource, ResolveOptions};
//! use skeuokit::models::AssetFormat;
//! use std::sync::Arc;
//!
//! let source = Arc::new(FsAssetSource::new("public/assets", "/assets"));
//! let loader = AssetLoader::new(source);
//!
//! let icon = loader
//!     .resolve("wifi", &ResolveOptions::new().prefer([AssetFormat::Svg]))
//!     .await?;
//! ```

pub mod loader;
pub mod manifest;
pub mod sound;
pub mod source;

pub use loader::{
    AssetLoader, AssetPayload, AssetRecord, DEFAULT_MANIFEST_URL, LoadOptions, LoaderError,
    PreloadFailure, PreloadReport, ResolveOptions,
};
pub use manifest::{ManifestError, ManifestGenerator};
pub use sound::{
    AudioSink, LogSink, Playback, RecordingSink, SoundCue, SoundError, SoundManager, ToneProfile,
    Waveform, synthesize,
};
pub use source::{AssetSource, CacheMode, FsAssetSource, SourceError};
