//! API key authentication for the sync server.
//!
//! Keys live in a YAML config file; each key maps to a user and a group.
//! All documents are scoped per group, so two households sharing one server
//! never see each other's data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// API key entry in the server config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: String,
    pub group_id: String,
}

/// Server config file structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeysFile {
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

impl KeysFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse {}: {}", path.display(), e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(format!("Failed to read {}: {}", path.display(), e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        let contents = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize keys: {}", e))?;
        std::fs::write(path, contents)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }
}

/// Authenticated user info, added to request extensions after auth.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub group_id: String,
}

/// API key store - maps key -> AuthUser.
#[derive(Debug, Clone)]
pub struct ApiKeyStore {
    keys: HashMap<String, AuthUser>,
}

impl ApiKeyStore {
    /// Load API keys from config file.
    pub fn load(config_path: &PathBuf) -> Self {
        let keys = match KeysFile::load(config_path) {
            Ok(file) => {
                let mut map = HashMap::new();
                for entry in file.api_keys {
                    map.insert(
                        entry.key,
                        AuthUser {
                            user_id: entry.user_id,
                            group_id: entry.group_id,
                        },
                    );
                }
                tracing::info!("Loaded {} API key(s)", map.len());
                map
            }
            Err(e) => {
                tracing::warn!("{}", e);
                tracing::warn!("No API keys loaded - all authenticated requests will fail");
                HashMap::new()
            }
        };

        Self { keys }
    }

    /// Validate an API key and return the associated user.
    pub fn validate(&self, key: &str) -> Option<AuthUser> {
        self.keys.get(key).cloned()
    }
}
