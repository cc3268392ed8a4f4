//! # History Store
//!
//! An ordered, bounded list of past results, newest first, persisted as a
//! single JSON blob under the `qrHistory` key.
//!
//! ## Persisted layout
//!
//! ```json
//! [
//!   { "data": "https://example.com", "qrImage": "data:image/png;base64,…", "timestamp": 1718000000000 }
//! ]
//! ```
//!
//! Persistence failures are logged and never surface to the caller: the
//! in-memory store stays authoritative for the running process.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::QuickQrError;

/// Maximum number of entries kept.
pub const HISTORY_LIMIT: usize = 50;

/// Key the history blob is stored under.
pub const HISTORY_KEY: &str = "qrHistory";

/// One persisted past result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Source text encoded in the image.
    pub data: String,
    /// Final image as a PNG data URI.
    pub qr_image: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(data: impl Into<String>, qr_image: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            qr_image: qr_image.into(),
            // Millisecond precision, matching the persisted form.
            timestamp: Utc::now().trunc_subsecs(3),
        }
    }
}

/// A named-blob store, written whole on every save.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, QuickQrError>;
    fn set(&self, key: &str, value: &str) -> Result<(), QuickQrError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, QuickQrError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            QuickQrError::Persistence(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, QuickQrError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QuickQrError::Persistence(e.to_string())),
        }
    }

    /// Write to a sibling temp file and rename over the target.
    fn set(&self, key: &str, value: &str) -> Result<(), QuickQrError> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value).map_err(|e| QuickQrError::Persistence(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| QuickQrError::Persistence(e.to_string()))
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, QuickQrError> {
        let values = self
            .values
            .lock()
            .map_err(|_| QuickQrError::Persistence("store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), QuickQrError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| QuickQrError::Persistence("store lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Bounded, newest-first history backed by a [`KeyValueStore`].
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    backend: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl HistoryStore {
    /// Load the persisted history.
    ///
    /// Missing, unreadable or corrupt data yields an empty store.
    pub fn load(backend: Box<dyn KeyValueStore>) -> Self {
        let entries = match backend.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(mut entries) => {
                    entries.truncate(HISTORY_LIMIT);
                    entries
                }
                Err(e) => {
                    tracing::warn!(error = %e, "history is corrupt; starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "history is unreadable; starting empty");
                Vec::new()
            }
        };

        tracing::info!(entries = entries.len(), "loaded history");
        Self { entries, backend }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Insert at the head, evicting from the tail beyond [`HISTORY_LIMIT`].
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
        if self.entries.len() > HISTORY_LIMIT {
            let evicted = self.entries.len() - HISTORY_LIMIT;
            self.entries.truncate(HISTORY_LIMIT);
            tracing::debug!(evicted, "history limit reached");
        }
        self.persist();
    }

    /// Return the entry at `index` without reordering.
    pub fn restore(&self, index: usize) -> Result<&HistoryEntry, QuickQrError> {
        self.entries
            .get(index)
            .ok_or_else(|| QuickQrError::NotFound(format!("history entry {index}")))
    }

    /// Delete the entry at `index`.
    pub fn remove(&mut self, index: usize) -> Result<HistoryEntry, QuickQrError> {
        if index >= self.entries.len() {
            return Err(QuickQrError::NotFound(format!("history entry {index}")));
        }
        let entry = self.entries.remove(index);
        self.persist();
        Ok(entry)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.entries)
            .map_err(QuickQrError::from)
            .and_then(|json| self.backend.set(HISTORY_KEY, &json));
        if let Err(e) = result {
            tracing::error!(error = %e, "failed to persist history");
        }
    }
}
