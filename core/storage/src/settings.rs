//! Persisted user settings: token, storage preferences, cached theme.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use nexushub_common::{Error, ProviderKind, Result, SecretString};

use crate::config::ConfigLayer;

pub const TOKEN_KEY: &str = "token";
pub const STORAGE_SETTINGS_KEY: &str = "storage_settings";
pub const THEME_KEY: &str = "theme";

/// User's storage preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    /// Preferred provider name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_storage: Option<String>,
    /// Per-provider overrides, keyed by provider name.
    #[serde(default)]
    pub providers: BTreeMap<String, ConfigLayer>,
}

impl StorageSettings {
    pub fn overrides(&self, kind: ProviderKind) -> Option<&ConfigLayer> {
        self.providers.get(kind.as_str())
    }

    pub fn set_override(&mut self, kind: ProviderKind, key: impl Into<String>, value: impl Into<Value>) {
        self.providers
            .entry(kind.as_str().to_string())
            .or_default()
            .insert(key.into(), value.into());
    }
}

/// Key-value settings persisted as one JSON object.
///
/// Changes stay in memory until [`SettingsStore::save`].
#[derive(Debug, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    entries: Map<String, Value>,
}

impl SettingsStore {
    /// Store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// `<config dir>/nexushub/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nexushub").join("settings.json"))
    }

    /// Load settings from a file. A missing file yields empty settings.
    ///
    /// # Errors
    /// - I/O errors other than a missing file
    /// - `Serialization` if the file is not a JSON object
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::Serialization(format!(
                    "Invalid settings file {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}", path.display());
                Map::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Typed value for a key.
    ///
    /// # Errors
    /// - `Serialization` if the stored value has another shape
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.entries
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    Error::Serialization(format!("Invalid setting '{}': {}", key, e))
                })
            })
            .transpose()
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| Error::Serialization(format!("Invalid setting '{}': {}", key, e)))?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Write the settings file, creating its directory.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Stored bearer token.
    pub fn token(&self) -> Option<SecretString> {
        self.entries
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(SecretString::new)
    }

    /// Replace or clear the stored bearer token.
    pub fn set_token(&mut self, token: Option<&str>) {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.entries
                    .insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
            }
            None => {
                self.entries.remove(TOKEN_KEY);
            }
        }
    }

    /// Stored storage preferences. Unreadable preferences count as absent.
    pub fn storage_settings(&self) -> Option<StorageSettings> {
        match self.get(STORAGE_SETTINGS_KEY) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring stored storage settings: {}", e);
                None
            }
        }
    }

    pub fn set_storage_settings(&mut self, settings: &StorageSettings) -> Result<()> {
        self.set(STORAGE_SETTINGS_KEY, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();
        assert!(store.token().is_none());
        assert!(store.storage_settings().is_none());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = SettingsStore::open(&path).unwrap();
        store.set_token(Some("abc123"));

        let mut settings = StorageSettings {
            default_storage: Some("qiniu".to_string()),
            ..Default::default()
        };
        settings.set_override(ProviderKind::Qiniu, "bucket", "mine");
        store.set_storage_settings(&settings).unwrap();
        store.save().unwrap();

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.token().unwrap().expose(), "abc123");
        let loaded = reopened.storage_settings().unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(
            loaded.overrides(ProviderKind::Qiniu).unwrap()["bucket"],
            json!("mine")
        );

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["storage_settings"]["defaultStorage"], json!("qiniu"));
    }

    #[test]
    fn test_corrupt_storage_settings_are_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"token": "t", "storage_settings": "not an object"}"#,
        )
        .unwrap();

        let store = SettingsStore::open(&path).unwrap();
        assert!(store.storage_settings().is_none());
        assert_eq!(store.token().unwrap().expose(), "t");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            SettingsStore::open(&path),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_clearing_token() {
        let mut store = SettingsStore::in_memory();
        store.set_token(Some("t"));
        store.set_token(Some(""));
        assert!(store.token().is_none());
        assert!(store.save().is_ok());
    }
}
