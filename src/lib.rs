// skeuokit - settings engine and asset tooling for a skeuomorphic Game Center
//
// This is the library crate containing the settings reducer and store, the
// asset manifest generator and runtime loader, and the UI sound cues.
// The binary crate (main.rs) provides the command line entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{AppConfig, AssetEntry, AssetManifest, SettingsState};
pub use persistence::{SettingsPersistence, Storage};
pub use services::{AssetLoader, ManifestGenerator, SoundManager};
pub use state::{SettingsAction, SettingsChange, SettingsStore, reduce};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
