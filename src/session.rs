use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reserved store key holding the theme selection. Keys with this prefix
/// never show up in library listings.
pub const RESERVED_PREFIX: &str = "__lectern";
const THEME_KEY: &str = "__lectern_theme__";

const APP_NAME: &str = "lectern";
const STORE_FILENAME: &str = "sessions.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access session store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("session store {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Bookmark {
    pub scroll: usize,
    pub preview: String,
}

/// Persisted per-document reading session.
///
/// `total_lines` is a cache of the live reflow output length, overwritten on
/// every open; `timestamp` is an RFC 3339 string and may be empty for
/// entries that were never stamped.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionState {
    #[serde(default)]
    pub scroll: usize,
    #[serde(default)]
    pub total_lines: usize,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

/// One JSON object on disk, keyed by absolute document path as given.
/// Every operation is a full read-modify-write with no locking; concurrent
/// writers are last-write-wins.
pub struct SessionStore {
    file_path: PathBuf,
}

impl SessionStore {
    /// Open the store, validating that whatever is on disk parses. A missing
    /// file is created empty ("no prior sessions"); invalid JSON is fatal
    /// here so the caller can tell the user to reset instead of silently
    /// clobbering.
    pub fn open(file_path: PathBuf) -> Result<Self, StoreError> {
        let store = Self { file_path };
        let map = store.read_all()?;
        if !store.file_path.exists() {
            store.write_all(&map)?;
        }
        Ok(store)
    }

    /// Store backed by a file that is not read until first use. Tests use
    /// this to point at a temp location.
    pub fn at(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Remove the backing file. Recovery path for a corrupt store.
    pub fn reset(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.file_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.file_path.display().to_string(),
                source,
            }),
        }
    }

    pub fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.file_path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.file_path).map_err(|source| StoreError::Io {
            path: self.file_path.display().to_string(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: self.file_path.display().to_string(),
                source,
            })?;
        match value {
            Value::Object(map) => Ok(map),
            other => {
                warn!("session store root is {other:?}, expected an object; starting empty");
                Ok(Map::new())
            }
        }
    }

    pub fn write_all(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(map.clone())).map_err(
            |source| StoreError::Corrupt {
                path: self.file_path.display().to_string(),
                source,
            },
        )?;
        fs::write(&self.file_path, content).map_err(|source| StoreError::Io {
            path: self.file_path.display().to_string(),
            source,
        })
    }

    /// Load the session for a document path. Absence is not an error: a
    /// default state comes back.
    pub fn load(&self, doc_path: &str) -> Result<SessionState, StoreError> {
        let map = self.read_all()?;
        Ok(map
            .get(doc_path)
            .map(|value| state_from_value(doc_path, value))
            .unwrap_or_default())
    }

    /// Persist a plain position update, keeping the entry's bookmarks and
    /// stamping the timestamp with the current time.
    pub fn save_position(
        &self,
        doc_path: &str,
        scroll: usize,
        total_lines: usize,
    ) -> Result<(), StoreError> {
        let mut map = self.read_all()?;
        let mut state = map
            .get(doc_path)
            .map(|value| state_from_value(doc_path, value))
            .unwrap_or_default();
        state.scroll = scroll;
        state.total_lines = total_lines;
        state.timestamp = now_stamp();
        map.insert(doc_path.to_string(), to_value(&state));
        self.write_all(&map)
    }

    /// Persist a full state verbatim, including whatever timestamp the
    /// caller put in it.
    pub fn save_state(&self, doc_path: &str, state: &SessionState) -> Result<(), StoreError> {
        let mut map = self.read_all()?;
        map.insert(doc_path.to_string(), to_value(state));
        self.write_all(&map)
    }

    /// All document entries, reserved keys excluded. Order is whatever the
    /// underlying map yields; callers sort.
    pub fn entries(&self) -> Result<Vec<(String, SessionState)>, StoreError> {
        let map = self.read_all()?;
        Ok(map
            .iter()
            .filter(|(key, _)| !key.starts_with(RESERVED_PREFIX))
            .map(|(key, value)| (key.clone(), state_from_value(key, value)))
            .collect())
    }

    pub fn load_theme(&self) -> Result<Option<String>, StoreError> {
        let map = self.read_all()?;
        Ok(map
            .get(THEME_KEY)
            .and_then(|value| value.get("theme"))
            .and_then(|name| name.as_str())
            .map(|name| name.to_string()))
    }

    pub fn save_theme(&self, name: &str) -> Result<(), StoreError> {
        let mut map = self.read_all()?;
        map.insert(
            THEME_KEY.to_string(),
            serde_json::json!({ "theme": name }),
        );
        self.write_all(&map)
    }
}

/// Current time as an RFC 3339 UTC string. These sort lexicographically, so
/// the library can order entries without parsing them back.
pub fn now_stamp() -> String {
    Utc::now().to_rfc3339()
}

/// Decode one store entry. Early versions of the store persisted a bare
/// integer scroll per document; those migrate to a default state carrying
/// just the scroll. Anything else unexpected decays to a default state with
/// a warning rather than poisoning the whole store.
fn state_from_value(doc_path: &str, value: &Value) -> SessionState {
    if let Some(scroll) = value.as_u64() {
        return SessionState {
            scroll: scroll as usize,
            ..SessionState::default()
        };
    }
    match serde_json::from_value(value.clone()) {
        Ok(state) => state,
        Err(e) => {
            warn!("unreadable session entry for {doc_path}: {e}; starting fresh");
            SessionState::default()
        }
    }
}

fn to_value(state: &SessionState) -> Value {
    serde_json::to_value(state).expect("SessionState serializes")
}

/// Default store location under the user data directory, e.g.
/// `~/.local/share/lectern/sessions.json`.
pub fn default_store_path() -> Option<PathBuf> {
    dirs::data_dir().map(|data| data.join(APP_NAME).join(STORE_FILENAME))
}

/// Log file path under the state directory, falling back to the cache
/// directory on platforms without one.
pub fn resolve_log_path() -> Option<PathBuf> {
    let base = dirs::state_dir().or_else(dirs::cache_dir)?;
    Some(base.join(APP_NAME).join(format!("{APP_NAME}.log")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, SessionStore) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::at(dir.path().join("sessions.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_store_reads_empty() {
        let (_dir, store) = temp_store();
        assert!(store.read_all().unwrap().is_empty());
        assert_eq!(store.load("/some/doc.txt").unwrap(), SessionState::default());
    }

    #[test]
    fn test_save_position_stamps_timestamp() {
        let (_dir, store) = temp_store();
        store.save_position("/a.txt", 12, 40).unwrap();
        let state = store.load("/a.txt").unwrap();
        assert_eq!(state.scroll, 12);
        assert_eq!(state.total_lines, 40);
        assert!(!state.timestamp.is_empty());
    }

    #[test]
    fn test_save_position_preserves_bookmarks() {
        let (_dir, store) = temp_store();
        let state = SessionState {
            scroll: 3,
            total_lines: 10,
            timestamp: String::new(),
            bookmarks: vec![Bookmark {
                scroll: 5,
                preview: "five".to_string(),
            }],
        };
        store.save_state("/a.txt", &state).unwrap();
        store.save_position("/a.txt", 8, 10).unwrap();
        let loaded = store.load("/a.txt").unwrap();
        assert_eq!(loaded.scroll, 8);
        assert_eq!(loaded.bookmarks, state.bookmarks);
    }

    #[test]
    fn test_save_state_is_verbatim() {
        let (_dir, store) = temp_store();
        let state = SessionState {
            scroll: 1,
            total_lines: 2,
            timestamp: "2024-01-02T03:04:05+00:00".to_string(),
            bookmarks: Vec::new(),
        };
        store.save_state("/a.txt", &state).unwrap();
        assert_eq!(store.load("/a.txt").unwrap(), state);
    }

    #[test]
    fn test_legacy_integer_entry_migrates() {
        let (_dir, store) = temp_store();
        let mut map = Map::new();
        map.insert("/old.txt".to_string(), serde_json::json!(42));
        store.write_all(&map).unwrap();
        let state = store.load("/old.txt").unwrap();
        assert_eq!(state.scroll, 42);
        assert_eq!(state.total_lines, 0);
        assert!(state.bookmarks.is_empty());
    }

    #[test]
    fn test_theme_roundtrip_and_reserved_key_hidden() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load_theme().unwrap(), None);
        store.save_theme("Catppuccin Mocha").unwrap();
        store.save_position("/a.txt", 0, 1).unwrap();
        assert_eq!(
            store.load_theme().unwrap(),
            Some("Catppuccin Mocha".to_string())
        );
        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "/a.txt");
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "{ not json").unwrap();
        let err = SessionStore::open(path);
        assert!(matches!(err, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_paths_are_not_canonicalized() {
        let (_dir, store) = temp_store();
        store.save_position("/a/./b.txt", 1, 2).unwrap();
        store.save_position("/a/b.txt", 3, 4).unwrap();
        assert_eq!(store.entries().unwrap().len(), 2);
    }
}
