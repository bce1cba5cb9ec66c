use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::sync::ReplaceStrategy;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// Default owner name for new records
    pub owner: String,
    /// Sync settings
    pub sync: SyncConfig,
}

/// Sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Server URL, e.g. "http://localhost:8080"
    pub server_url: Option<String>,
    /// API key for the sync server
    pub api_key: Option<String>,
    /// Synchronize automatically after mutating commands
    pub auto_sync: bool,
    /// How push replaces remote collections
    pub replace_strategy: ReplaceStrategy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            api_key: None,
            auto_sync: false,
            replace_strategy: ReplaceStrategy::default(),
        }
    }
}

impl SyncConfig {
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some() && self.api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self {
            database_path: PathBuf::from(&home).join(".pawtrack").join("pawtrack.db"),
            owner: "default".to_string(),
            sync: SyncConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("PAWTRACK_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(owner) = std::env::var("PAWTRACK_OWNER") {
            config.owner = owner;
        }
        if let Ok(url) = std::env::var("PAWTRACK_SYNC_URL") {
            config.sync.server_url = Some(url);
        }
        if let Ok(key) = std::env::var("PAWTRACK_SYNC_API_KEY") {
            config.sync.api_key = Some(key);
        }
        if let Ok(strategy) = std::env::var("PAWTRACK_SYNC_STRATEGY") {
            config.sync.replace_strategy = strategy
                .parse()
                .map_err(ConfigError::InvalidValue)?;
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/pawtrack/config.yaml
    pub fn default_config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("pawtrack")
            .join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                )
            }
            ConfigError::InvalidValue(e) => write!(f, "Invalid config value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config
            .database_path
            .to_string_lossy()
            .contains("pawtrack.db"));
        assert_eq!(config.owner, "default");
        assert!(!config.sync.is_configured());
        assert_eq!(config.sync.replace_strategy, ReplaceStrategy::FullReplace);
    }

    #[test]
    fn test_load_no_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.owner, "default");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /custom/path/db.sqlite").unwrap();
        writeln!(file, "owner: testuser").unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  server_url: \"http://localhost:9999\"").unwrap();
        writeln!(file, "  api_key: \"secret\"").unwrap();
        writeln!(file, "  replace_strategy: diff-upsert").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(
            config.database_path,
            PathBuf::from("/custom/path/db.sqlite")
        );
        assert_eq!(config.owner, "testuser");
        assert!(config.sync.is_configured());
        assert_eq!(config.sync.replace_strategy, ReplaceStrategy::DiffUpsert);
    }

    #[test]
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "owner: fromfile").unwrap();

        // Set env var
        std::env::set_var("PAWTRACK_OWNER", "fromenv");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.owner, "fromenv");

        // Clean up
        std::env::remove_var("PAWTRACK_OWNER");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
