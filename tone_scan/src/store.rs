// THEORY:
// The last match percentage is written to a small key-value store so a front end can
// show it next time. Nothing in the crate ever reads it back. A failed write is
// logged and otherwise ignored; it never fails the scan that produced the value.

use crate::core_modules::match_scorer::match_scorer::MatchScore;
use crate::error::Result;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const LAST_SCAN_KEY: &str = "lastScan";

pub trait KeyValueStore {
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn get(&self, key: &str) -> Option<String>;
}

/// In-process store. Clones share the same entries, so a handle kept by the caller
/// sees what a session wrote through its own clone.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(key).cloned()
    }
}

/// A flat JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonFileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Map::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            Map::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries
            .insert(key.to_string(), Value::String(value.to_string()));
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, text)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        match self.entries.get(key)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Records `score` under [`LAST_SCAN_KEY`].
pub fn record_last_scan(store: &mut dyn KeyValueStore, score: MatchScore) {
    match store.set(LAST_SCAN_KEY, &score.percent().to_string()) {
        Ok(()) => debug!("stored last scan {score}"),
        Err(err) => warn!("could not store last scan: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::match_scorer::match_scorer::score_from_delta_e;

    #[test]
    fn memory_store_keeps_latest_value() {
        let mut store = MemoryStore::new();
        record_last_scan(&mut store, score_from_delta_e(5.0));
        record_last_scan(&mut store, score_from_delta_e(10.0));
        assert_eq!(store.get(LAST_SCAN_KEY).as_deref(), Some("80"));
    }

    #[test]
    fn json_store_persists_across_opens() {
        let path = std::env::temp_dir().join(format!("tone_scan_store_{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        let mut store = JsonFileStore::open(&path).unwrap();
        record_last_scan(&mut store, MatchScore::PERFECT);
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get(LAST_SCAN_KEY).as_deref(), Some("100"));

        fs::remove_file(&path).unwrap();
    }
}
