//! Data models for skeuokit.
//!
//! - [`SettingsState`]: the immutable settings tree driven by the reducer in [`crate::state`]
//! - [`AssetManifest`] / [`AssetEntry`]: the asset manifest schema, shared by generator and loader
//! - [`AppConfig`]: application configuration loaded from `skeuokit.yaml`
//! - [`game_center`]: leaderboard and achievement helpers used by the Game Center views
//!
//! # Architecture Note
//!
//! Settings sections are `Arc`-shared so reducer steps reuse untouched subtrees.
//! Stores hand out snapshots, never `&mut` access.

pub mod asset;
pub mod config;
pub mod game_center;
pub mod settings;

pub use asset::{
    AssetCategory, AssetEntry, AssetFormat, AssetManifest, FORMAT_PRIORITY, ViewBox,
    compare_format_priority,
};
pub use config::{
    AppConfig, AssetsConfig, LoggingConfig, SoundConfig, StorageBackend, StorageConfig,
};
pub use settings::{
    AutoLockOption, ConnectivitySettings, DisplaySettings, DoNotDisturbSettings, GeneralSettings,
    NotificationSettings, Presentation, Schedule, Section, SettingsState, ShowPreviewOption,
    SoundSettings, percent_from_f64,
};
