//! Configuration file support for gymlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/gymlog/config.toml`.

use crate::units::{DistanceUnit, WeightUnit};
use crate::{Error, ReconcileOptions, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the database inside the data directory
pub const DATABASE_FILE: &str = "gymlog.json";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub units: UnitsConfig,

    #[serde(default)]
    pub prompts: PromptConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Preferred display units; storage is always kg/km
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct UnitsConfig {
    #[serde(default)]
    pub weight: WeightUnit,

    #[serde(default)]
    pub distance: DistanceUnit,
}

/// Confirmation prompts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Ask before finishing a workout
    #[serde(default = "default_true")]
    pub confirm_finish: bool,

    /// Ask before discarding data (deleting a workout)
    #[serde(default = "default_true")]
    pub confirm_discard: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            confirm_finish: true,
            confirm_discard: true,
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("gymlog")
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("gymlog").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Path of the database file under `data_dir`
    pub fn database_path(data_dir: &Path) -> PathBuf {
        data_dir.join(DATABASE_FILE)
    }

    /// Reconcile options carrying the preferred units
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            weight_unit: self.units.weight,
            distance_unit: self.units.distance,
            performed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.units.weight, WeightUnit::Kilograms);
        assert_eq!(config.units.distance, DistanceUnit::Kilometers);
        assert!(config.prompts.confirm_finish);
        assert!(config.prompts.confirm_discard);
        assert!(config.data.data_dir.ends_with("gymlog"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.units.weight, parsed.units.weight);
        assert_eq!(config.data.data_dir, parsed.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[units]
weight = "lb"

[prompts]
confirm_finish = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.units.weight, WeightUnit::Pounds);
        assert_eq!(config.units.distance, DistanceUnit::Kilometers); // default
        assert!(!config.prompts.confirm_finish);
        assert!(config.prompts.confirm_discard); // default

        let opts = config.reconcile_options();
        assert_eq!(opts.weight_unit, WeightUnit::Pounds);
        assert!(opts.performed_at.is_none());
    }

    #[test]
    fn test_save_to_and_load_from() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.units.distance = DistanceUnit::Miles;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.units.distance, DistanceUnit::Miles);
    }

    #[test]
    fn test_invalid_unit_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[units]\nweight = \"stone\"\n");
        assert!(result.is_err());
    }
}
