//! Configuration management for qrstash.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::category::{Category, DEFAULT_SEED};
use crate::decode::DEFAULT_MAX_DIMENSION;
use crate::error::{Error, Result};
use crate::images::{DEFAULT_EXTENSION, DEFAULT_JPEG_QUALITY};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "qrstash";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "qrstash.db";

/// Default images directory name.
const IMAGES_DIR_NAME: &str = "images";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `QRSTASH_`, sections separated
///    by `__`, e.g. `QRSTASH_STORAGE__JPEG_QUALITY=80`)
/// 2. TOML config file at `~/.config/qrstash/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Decoder configuration.
    pub decode: DecodeConfig,
    /// Category configuration.
    pub categories: CategoriesConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the preference database.
    /// Defaults to `~/.local/share/qrstash/qrstash.db`
    pub database_path: Option<PathBuf>,
    /// Directory holding saved images.
    /// Defaults to `~/.local/share/qrstash/images`
    pub images_dir: Option<PathBuf>,
    /// Extension given to saved image files.
    pub image_extension: String,
    /// JPEG quality (1-100) used when normalizing imported images.
    pub jpeg_quality: u8,
}

/// Decoder-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Longest image side, in pixels, passed to the QR detector.
    pub max_dimension: u32,
}

/// Category-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoriesConfig {
    /// Categories written on first launch. `All` is always added in front.
    pub seed: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            images_dir: None,
            image_extension: DEFAULT_EXTENSION.to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("QRSTASH_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.storage.jpeg_quality) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "jpeg_quality must be between 1 and 100, got {}",
                    self.storage.jpeg_quality
                ),
            });
        }

        let extension = &self.storage.image_extension;
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::ConfigValidation {
                message: format!("image_extension must be ASCII letters or digits, got {extension:?}"),
            });
        }

        if self.decode.max_dimension == 0 {
            return Err(Error::ConfigValidation {
                message: "max_dimension must be greater than 0".to_string(),
            });
        }

        for label in &self.categories.seed {
            if !Category::parse(label).is_some_and(|c| c.as_str() == label.as_str()) {
                return Err(Error::ConfigValidation {
                    message: format!(
                        "invalid seed category {label:?}: labels must be 1-12 characters without surrounding whitespace"
                    ),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the images directory, resolving defaults if not set.
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.storage
            .images_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(IMAGES_DIR_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert!(config.storage.images_dir.is_none());
        assert_eq!(config.storage.image_extension, "jpg");
        assert_eq!(config.storage.jpeg_quality, 90);
        assert_eq!(config.decode.max_dimension, 1000);
        assert_eq!(
            config.categories.seed,
            ["All", "Shop", "Gas", "Service", "Contacts"]
        );
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_jpeg_quality() {
        let mut config = Config::default();
        config.storage.jpeg_quality = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("jpeg_quality"));

        config.storage.jpeg_quality = 101;
        assert!(config.validate().is_err());

        config.storage.jpeg_quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_image_extension() {
        let mut config = Config::default();
        for bad in ["", ".jpg", "j/pg", "jp g"] {
            config.storage.image_extension = bad.to_string();
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("image_extension"), "extension: {bad:?}");
        }

        config.storage.image_extension = "png".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_max_dimension() {
        let mut config = Config::default();
        config.decode.max_dimension = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_dimension"));
    }

    #[test]
    fn test_validate_seed_labels() {
        let mut config = Config::default();
        for bad in ["", "  Shop", "Far too long a label"] {
            config.categories.seed = vec![bad.to_string()];
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("seed category"), "label: {bad:?}");
        }

        config.categories.seed = vec!["Work".to_string(), "Home".to_string()];
        assert!(config.validate().is_ok());

        config.categories.seed = Vec::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("qrstash.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));
        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_images_dir_default() {
        let path = Config::default().images_dir();
        assert!(path.ends_with("qrstash/images"));
    }

    #[test]
    fn test_images_dir_custom() {
        let mut config = Config::default();
        config.storage.images_dir = Some(PathBuf::from("/srv/qr"));
        assert_eq!(config.images_dir(), PathBuf::from("/srv/qr"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("qrstash"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[storage]
image_extension = "png"
jpeg_quality = 75

[decode]
max_dimension = 640

[categories]
seed = ["Work", "Home"]
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.storage.image_extension, "png");
        assert_eq!(config.storage.jpeg_quality, 75);
        assert_eq!(config.decode.max_dimension, 640);
        assert_eq!(config.categories.seed, ["Work", "Home"]);
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\njpeg_quality = 0\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_storage_config_deserialize() {
        let json = r#"{"image_extension": "png"}"#;
        let storage: StorageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(storage.image_extension, "png");
        assert_eq!(storage.jpeg_quality, 90);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("jpeg_quality"));
        assert!(json.contains("max_dimension"));
        assert!(json.contains("seed"));
    }
}
