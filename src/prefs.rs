//! Key-value preference store backed by a single JSON document.
//!
//! Holds the category list, the status list, the folder registry and the
//! legacy single-folder key. Explicitly constructed with its file path so
//! tests can point it at a tempdir.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::shared::errors::CoreResult;
use crate::shared::paths::{ensure_dir, get_storage_dir};

pub const PREFS_FILE_NAME: &str = "preferences.json";

pub struct PrefStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the shared document; callers
    /// hold different locks and would otherwise lose each other's keys.
    lock: Mutex<()>,
}

impl PrefStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Preference store at the app-private default location.
    pub fn open_default() -> Self {
        Self::new(get_storage_dir().join(PREFS_FILE_NAME))
    }

    fn read_document(&self) -> CoreResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let doc: Map<String, Value> = serde_json::from_str(&content)?;
        Ok(doc)
    }

    fn write_document(&self, doc: &Map<String, Value>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let content = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> CoreResult<Option<T>> {
        let _guard = self.lock.lock().unwrap();
        let doc = self.read_document()?;
        match doc.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> CoreResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut doc = self.read_document()?;
        doc.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_document(&doc)
    }

    pub fn remove(&self, key: &str) -> CoreResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut doc = self.read_document()?;
        if doc.remove(key).is_some() {
            self.write_document(&doc)?;
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> CoreResult<bool> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.read_document()?.contains_key(key))
    }
}
