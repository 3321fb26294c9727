//! User settings: the enabled flag and the last prompt.
//!
//! Persistence goes through [`SettingsStore`], a string key/value capability,
//! so nothing else in the crate touches storage directly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::APP_DIR;
use crate::error::{AutofillError, Result};

pub const KEY_ENABLED: &str = "autofill_enabled";
pub const KEY_PROMPT: &str = "autofill_prompt";

/// String key/value persistence.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Write several entries. Stores that persist override this to commit
    /// them in one write.
    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            prompt: String::new(),
        }
    }
}

impl Settings {
    /// Read both entries, using defaults for missing keys.
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Self {
        let defaults = Self::default();
        Self {
            enabled: store
                .get(KEY_ENABLED)
                .map(|v| v == "true")
                .unwrap_or(defaults.enabled),
            prompt: store.get(KEY_PROMPT).unwrap_or(defaults.prompt),
        }
    }

    pub fn save<S: SettingsStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        let enabled = if self.enabled { "true" } else { "false" };
        store.set_many(&[(KEY_ENABLED, enabled), (KEY_PROMPT, self.prompt.as_str())])
    }
}

/// Volatile store, for tests and one-shot runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Flat TOML table on disk, rewritten on every write. The in-memory table
/// only changes once the file has been written.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`, starting empty when it does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let values: BTreeMap<String, String> = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                AutofillError::Storage(format!("Failed to read {}: {e}", path.display()))
            })?;
            toml::from_str(&contents).map_err(|e| {
                AutofillError::Storage(format!("Failed to parse {}: {e}", path.display()))
            })?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = values.len(), "Opened settings store");
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// Open the store at ~/.config/situation-autofill/settings.toml.
    pub fn open_default() -> Result<Self> {
        Self::open(&Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            AutofillError::Storage("Could not determine config directory".into())
        })?;
        Ok(config_dir.join(APP_DIR).join("settings.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(values).map_err(|e| {
            AutofillError::Storage(format!("Failed to serialize settings: {e}"))
        })?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<()> {
        let mut next = self.values.clone();
        for (key, value) in entries {
            next.insert(key.to_string(), value.to_string());
        }
        self.flush(&next)?;
        self.values = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_keys_use_defaults() {
        let store = MemoryStore::default();
        assert_eq!(Settings::load(&store), Settings::default());
        assert!(Settings::default().enabled);
    }

    #[test]
    fn anything_but_true_is_disabled() {
        let mut store = MemoryStore::default();
        store.set(KEY_ENABLED, "yes").unwrap();
        assert!(!Settings::load(&store).enabled);
        store.set(KEY_ENABLED, "true").unwrap();
        assert!(Settings::load(&store).enabled);
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("autofill").join("settings.toml");

        let mut store = FileStore::open(&path).unwrap();
        let settings = Settings {
            enabled: false,
            prompt: "1=rain, 2=\"neon, sign\"\nline two".to_string(),
        };
        settings.save(&mut store).unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(Settings::load(&reopened), settings);
    }

    #[test]
    fn failed_save_leaves_the_store_untouched() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("settings.toml");

        let mut store = FileStore::open(&path).unwrap();
        let settings = Settings {
            enabled: false,
            prompt: "1=rain".to_string(),
        };
        assert!(settings.save(&mut store).is_err());

        assert_eq!(store.get(KEY_ENABLED), None);
        assert_eq!(store.get(KEY_PROMPT), None);
        assert!(!path.exists());
    }

    #[test]
    fn save_writes_both_keys_in_one_file_update() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut store = FileStore::open(&path).unwrap();
        store.set(KEY_PROMPT, "old").unwrap();

        Settings {
            enabled: false,
            prompt: "new".to_string(),
        }
        .save(&mut store)
        .unwrap();

        let on_disk: BTreeMap<String, String> =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.get(KEY_ENABLED).map(String::as_str), Some("false"));
        assert_eq!(on_disk.get(KEY_PROMPT).map(String::as_str), Some("new"));
    }

    #[test]
    fn corrupt_settings_file_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "autofill_enabled = [").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(AutofillError::Storage(_))
        ));
    }
}
