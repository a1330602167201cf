use crate::models::{AppConfig, StorageBackend, StorageConfig};
use crate::persistence::{FileStorage, MemoryStorage, SettingsPersistence};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::sync::Arc;

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "skeuokit.yaml";

/// Prefix for environment overrides, e.g. `SKEUOKIT__ASSETS__ROOT=public/assets`
pub const ENV_PREFIX: &str = "SKEUOKIT";

/// Configuration manager for loading and saving `skeuokit.yaml`.
///
/// Values are layered: built-in defaults, then the YAML file if it exists,
/// then `SKEUOKIT__<SECTION>__<KEY>` environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory holding `skeuokit.yaml`; created if missing
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// Load the configuration with environment overrides applied.
    ///
    /// # Returns
    /// The merged AppConfig; defaults when neither file nor overrides exist
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with_env(None)
    }

    /// Load the configuration, reading overrides from `env` instead of the
    /// process environment when given
    pub fn load_with_env(&self, env: Option<config::Map<String, String>>) -> Result<AppConfig> {
        if self.config_path.exists() {
            tracing::debug!("Reading config from {}", self.config_path);
        } else {
            tracing::debug!("Config file not found at {}, using defaults", self.config_path);
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(self.config_path.as_std_path()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!("Loaded config (assets root {})", config.assets.root);
        Ok(config)
    }

    /// Save the configuration file.
    ///
    /// # Arguments
    /// * `config` - The AppConfig to save
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Resolve a configured path against the config directory
    pub fn resolve_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    /// Build the settings persistence for the configured storage backend
    pub fn open_persistence(&self, storage: &StorageConfig) -> SettingsPersistence {
        match storage.backend {
            StorageBackend::File => {
                let dir = self.resolve_path(&storage.dir);
                tracing::debug!("Settings storage: files under {}", dir);
                SettingsPersistence::with_key(Arc::new(FileStorage::new(dir)), &storage.key)
            }
            StorageBackend::Memory => {
                tracing::debug!("Settings storage: memory");
                SettingsPersistence::with_key(Arc::new(MemoryStorage::new()), &storage.key)
            }
            StorageBackend::Disabled => {
                tracing::debug!("Settings storage disabled");
                SettingsPersistence::unavailable()
            }
        }
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    fn no_env() -> Option<config::Map<String, String>> {
        Some(config::Map::new())
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        let config = manager.load_with_env(no_env()).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_save_config() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = AppConfig::default();
        config.assets.root = Utf8PathBuf::from("public/assets");
        config.storage.backend = StorageBackend::Memory;
        config.storage.dir = Utf8PathBuf::from("state/settings");
        config.sound.sample_rate = 22050;
        manager.save(&config).unwrap();

        let loaded = manager.load_with_env(no_env()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_env_overrides_file() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.config_path(), "logging:\n  debug: false\n  prefix: demo\n").unwrap();

        let env = [
            ("SKEUOKIT__LOGGING__DEBUG", "true"),
            ("SKEUOKIT__ASSETS__WEB_PREFIX", "/static"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = manager.load_with_env(Some(env)).unwrap();
        assert!(config.logging.debug);
        assert_eq!(config.logging.prefix, "demo");
        assert_eq!(config.assets.web_prefix, "/static");
    }

    #[test]
    fn test_invalid_backend_is_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.config_path(), "storage:\n  backend: cloud\n").unwrap();

        assert!(manager.load_with_env(no_env()).is_err());
    }

    #[test]
    fn test_resolve_path() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert_eq!(
            manager.resolve_path(Utf8Path::new("state")),
            manager.config_dir().join("state")
        );
        let absolute = manager.config_dir().join("elsewhere");
        assert_eq!(manager.resolve_path(&absolute), absolute);
    }

    #[test]
    fn test_open_persistence_backends() {
        let (manager, _temp_dir) = create_test_config_manager();

        let disabled = StorageConfig {
            backend: StorageBackend::Disabled,
            ..StorageConfig::default()
        };
        assert!(!manager.open_persistence(&disabled).is_available());

        let file = manager.open_persistence(&StorageConfig::default());
        assert!(file.is_available());
        assert!(file.persist(&crate::models::SettingsState::default()));
        assert!(
            manager
                .config_dir()
                .join(".skeuokit")
                .join(format!("{}.json", crate::persistence::SETTINGS_STORAGE_KEY))
                .exists()
        );
    }
}
