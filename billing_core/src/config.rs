//! Configuration file support for the billing system.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/emsbill/config.toml`.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the table files and generated submission files
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

/// Reconciliation configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ReconcileConfig {
    /// Directory where ministry response files arrive; defaults to the
    /// data directory
    #[serde(default)]
    pub response_dir: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home).join(".local/share")
    });
    base.join("emsbill")
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
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
            let home = std::env::var("HOME").expect("HOME environment variable not set");
            PathBuf::from(home).join(".config")
        });
        base.join("emsbill").join("config.toml")
    }

    /// Directory where ministry response files are looked up
    pub fn response_dir(&self) -> &Path {
        self.reconcile
            .response_dir
            .as_deref()
            .unwrap_or(&self.data.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.data.data_dir.ends_with("emsbill"));
        assert_eq!(config.response_dir(), config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[reconcile]
response_dir = "/srv/ministry/inbox"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.response_dir(), Path::new("/srv/ministry/inbox"));
        assert!(config.data.data_dir.ends_with("emsbill")); // default
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[data]\ndata_dir = \"/var/lib/emsbill\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data.data_dir, PathBuf::from("/var/lib/emsbill"));
    }
}
