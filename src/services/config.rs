use crate::models::config::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "ocr-converter";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("Config file I/O failed ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration manager for app settings
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a manager rooted in the platform config directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(APP_DIR);

        fs::create_dir_all(&config_dir).map_err(|source| ConfigError::Io {
            path: config_dir.clone(),
            source,
        })?;

        Ok(Self::in_dir(config_dir))
    }

    /// Manager for an explicit directory (not created until first save)
    pub fn in_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let config_path = config_dir.join(CONFIG_FILE);
        Self {
            config_dir,
            config_path,
        }
    }

    /// Validate and write configuration to disk
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::Invalid)?;

        fs::create_dir_all(&self.config_dir).map_err(|source| ConfigError::Io {
            path: self.config_dir.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(config)?;

        fs::write(&self.config_path, json).map_err(|source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        })?;

        tracing::debug!(path = %self.config_path.display(), "config saved");
        Ok(())
    }

    /// Load configuration from disk
    ///
    /// If config file doesn't exist, returns default configuration
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        })?;

        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate().map_err(ConfigError::Invalid)?;

        Ok(config)
    }

    /// Load, falling back to defaults when the file is unreadable
    pub fn load_or_default(&self) -> AppConfig {
        self.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default config");
            AppConfig::default()
        })
    }

    pub fn config_file_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::OcrEngineKind;
    use crate::models::language::LanguageCode;
    use tempfile::TempDir;

    fn create_test_manager() -> (TempDir, ConfigManager) {
        let temp = tempfile::tempdir().unwrap();
        // Nested so save() has to create it
        let manager = ConfigManager::in_dir(temp.path().join(APP_DIR));
        (temp, manager)
    }

    #[test]
    fn test_config_load_default_when_not_exists() {
        let (_temp, manager) = create_test_manager();

        assert!(!manager.config_exists());

        let config = manager.load().unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let (_temp, manager) = create_test_manager();

        let mut config = AppConfig::default();
        config.ocr.engine = OcrEngineKind::Http;
        config.ocr.default_language = LanguageCode::Fra;
        config.export.overwrite = true;

        manager.save(&config).expect("save should succeed");
        assert!(manager.config_exists());

        let loaded = manager.load().expect("load should succeed");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_overwrite() {
        let (_temp, manager) = create_test_manager();

        let mut config1 = AppConfig::default();
        config1.ocr.timeout_secs = 10;
        manager.save(&config1).unwrap();

        let mut config2 = AppConfig::default();
        config2.ocr.timeout_secs = 30;
        manager.save(&config2).unwrap();

        assert_eq!(manager.load().unwrap().ocr.timeout_secs, 30);
    }

    #[test]
    fn test_invalid_config_is_not_saved() {
        let (_temp, manager) = create_test_manager();

        let mut config = AppConfig::default();
        config.export.pdf.font_size = -3.0;

        let result = manager.save(&config);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert!(!manager.config_exists());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_default() {
        let (_temp, manager) = create_test_manager();
        fs::create_dir_all(&manager.config_dir).unwrap();
        fs::write(manager.config_file_path(), "{ not json").unwrap();

        assert!(matches!(manager.load(), Err(ConfigError::Json(_))));
        assert_eq!(manager.load_or_default(), AppConfig::default());
    }

    #[test]
    fn test_config_file_path() {
        let (_temp, manager) = create_test_manager();
        assert!(manager.config_file_path().ends_with("config.json"));
    }
}
