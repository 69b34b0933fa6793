//! Option persistence used for language options and the translation config.
//!
//! The host supplies an [`OptionStore`]; every access is a single-key read
//! or write with last-writer-wins semantics.

use crate::error::{Result, RouterError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

/// Option key holding the per-locale language options.
pub const LANGUAGES_OPTION: &str = "wpm_languages";

/// Option key holding the raw entity translation config.
pub const CONFIG_OPTION: &str = "wpm_config";

/// Option key holding the site default locale.
pub const DEFAULT_LOCALE_OPTION: &str = "WPLANG";

/// Key/value persistence for option records.
pub trait OptionStore: Send + Sync {
    /// Read an option. `Ok(None)` means the key was never written.
    fn get_option(&self, key: &str) -> Result<Option<Value>>;

    /// Write an option, replacing any previous value.
    fn set_option(&self, key: &str, value: Value) -> Result<()>;
}

impl<T: OptionStore + ?Sized> OptionStore for Arc<T> {
    fn get_option(&self, key: &str) -> Result<Option<Value>> {
        (**self).get_option(key)
    }

    fn set_option(&self, key: &str, value: Value) -> Result<()> {
        (**self).set_option(key, value)
    }
}

/// In-process store, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    options: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given options.
    pub fn with_options<I, K>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            options: RwLock::new(options.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl OptionStore for MemoryStore {
    fn get_option(&self, key: &str) -> Result<Option<Value>> {
        let options = self.options.read().map_err(|_| RouterError::Poisoned)?;
        Ok(options.get(key).cloned())
    }

    fn set_option(&self, key: &str, value: Value) -> Result<()> {
        let mut options = self.options.write().map_err(|_| RouterError::Poisoned)?;
        options.insert(key.to_string(), value);
        Ok(())
    }
}

/// Options persisted as a single JSON object on disk.
///
/// The whole file is rewritten on every `set_option`.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    options: Arc<Mutex<Map<String, Value>>>,
}

impl JsonFileStore {
    /// Open the store, creating an empty one if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let options = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => match serde_json::from_str::<Value>(&contents)? {
                Value::Object(map) => map,
                other => {
                    return Err(RouterError::MalformedOption {
                        key: path.display().to_string(),
                        reason: format!("expected a JSON object, found {}", type_name(&other)),
                    })
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Option file {} not found, starting empty", path.display());
                Map::new()
            }
            Err(source) => {
                return Err(RouterError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        Ok(Self {
            path,
            options: Arc::new(Mutex::new(options)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, options: &Map<String, Value>) -> Result<()> {
        let contents = serde_json::to_string_pretty(options)?;
        std::fs::write(&self.path, contents).map_err(|source| RouterError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl OptionStore for JsonFileStore {
    fn get_option(&self, key: &str) -> Result<Option<Value>> {
        let options = self.options.lock().map_err(|_| RouterError::Poisoned)?;
        Ok(options.get(key).cloned())
    }

    fn set_option(&self, key: &str, value: Value) -> Result<()> {
        let mut options = self.options.lock().map_err(|_| RouterError::Poisoned)?;
        options.insert(key.to_string(), value);
        self.flush(&options)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    fn create_test_store() -> (JsonFileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("options.json");
        let store = JsonFileStore::open(&path).expect("Failed to open store");
        (store, temp_dir)
    }

    // ==================== MemoryStore Tests ====================

    #[test]
    fn test_memory_store_missing_key() {
        let store = MemoryStore::new();
        assert!(store.get_option("nope").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_set_then_get() {
        let store = MemoryStore::new();
        store.set_option(DEFAULT_LOCALE_OPTION, json!("fr_FR")).unwrap();
        assert_eq!(
            store.get_option(DEFAULT_LOCALE_OPTION).unwrap(),
            Some(json!("fr_FR"))
        );
    }

    #[test]
    fn test_memory_store_last_writer_wins() {
        let store = MemoryStore::with_options([("k", json!(1))]);
        store.set_option("k", json!(2)).unwrap();
        assert_eq!(store.get_option("k").unwrap(), Some(json!(2)));
    }

    // ==================== JsonFileStore Tests ====================

    #[test]
    fn test_file_store_starts_empty() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.get_option(LANGUAGES_OPTION).unwrap().is_none());
        assert!(!store.path().exists(), "Nothing written until first set");
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("options.json");

        {
            let store = JsonFileStore::open(&path).expect("open");
            store
                .set_option(LANGUAGES_OPTION, json!({"en_US": {"slug": "en"}}))
                .expect("set");
        }

        let store = JsonFileStore::open(&path).expect("reopen");
        assert_eq!(
            store.get_option(LANGUAGES_OPTION).unwrap(),
            Some(json!({"en_US": {"slug": "en"}}))
        );
    }

    #[test]
    fn test_file_store_rejects_non_object() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("options.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let result = JsonFileStore::open(&path);
        assert!(matches!(result, Err(RouterError::MalformedOption { .. })));
    }

    #[test]
    fn test_file_store_rejects_invalid_json() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("options.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(JsonFileStore::open(&path), Err(RouterError::Json(_))));
    }

    #[test]
    fn test_file_store_invalid_directory() {
        let store = JsonFileStore::open("/non/existent/dir/options.json").expect("open is lazy");
        let result = store.set_option("k", json!(1));
        assert!(matches!(result, Err(RouterError::Io { .. })));
    }
}
