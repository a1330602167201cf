use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Application configuration from `skeuokit.yaml`
///
/// Every section falls back to its defaults when absent, so an empty file is
/// a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sound: SoundConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory scanned by the manifest generator and served by the loader
    #[serde(default = "default_asset_root")]
    pub root: Utf8PathBuf,

    /// Manifest file name, relative to `root`
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Web prefix the asset root is served under
    #[serde(default = "default_web_prefix")]
    pub web_prefix: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: default_asset_root(),
            manifest_file: default_manifest_file(),
            web_prefix: default_web_prefix(),
        }
    }
}

impl AssetsConfig {
    /// Filesystem path of the manifest
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.root.join(&self.manifest_file)
    }

    /// Web path the loader fetches the manifest from
    pub fn manifest_url(&self) -> String {
        format!("{}/{}", self.web_prefix.trim_end_matches('/'), self.manifest_file)
    }
}

/// Where the settings blob lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per key under `storage.dir`
    #[default]
    File,
    /// Process memory only; lost on exit
    Memory,
    /// No storage available (headless); nothing is loaded or persisted
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_storage_dir")]
    pub dir: Utf8PathBuf,

    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            dir: default_storage_dir(),
            key: default_storage_key(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,

    #[serde(default = "default_log_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_true")]
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            prefix: default_log_prefix(),
            debug: false,
            console: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
        }
    }
}

fn default_asset_root() -> Utf8PathBuf {
    Utf8PathBuf::from("assets")
}

fn default_manifest_file() -> String {
    "asset-manifest.json".to_string()
}

fn default_web_prefix() -> String {
    "/assets".to_string()
}

fn default_storage_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".skeuokit")
}

fn default_storage_key() -> String {
    crate::persistence::SETTINGS_STORAGE_KEY.to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_prefix() -> String {
    "skeuokit".to_string()
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.assets.root, "assets");
        assert_eq!(config.assets.manifest_path(), "assets/asset-manifest.json");
        assert_eq!(config.assets.manifest_url(), "/assets/asset-manifest.json");
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.key, "skeuo-settings-state");
        assert_eq!(config.sound.sample_rate, 44_100);
        assert!(config.logging.console);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config: AppConfig = serde_yaml_ng::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "assets:\n  web_prefix: /static/\nstorage:\n  backend: disabled\n";
        let config: AppConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.assets.manifest_url(), "/static/asset-manifest.json");
        assert_eq!(config.assets.root, "assets");
        assert_eq!(config.storage.backend, StorageBackend::Disabled);
    }
}
