//! Durable key-value storage collaborators.
//!
//! Read state is persisted through a narrow per-key string interface: get,
//! set, remove, no transactions. `FileStorage` maps each key to a file under
//! a data directory; `MemoryStorage` backs tests and counts writes so
//! debounce behaviour can be asserted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use parking_lot::Mutex;

/// Per-key string storage, the shape of a browser origin store.
///
/// Implementations must tolerate missing keys; callers tolerate malformed
/// values. Writes are fire-and-forget: failures are logged by the
/// implementation, never surfaced.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicU64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls observed, across all keys.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

/// File-backed storage: one file per key under `dir`.
///
/// Uses a write-to-temp-then-rename pattern so an unexpected shutdown
/// mid-write never leaves a half-written value behind.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create storage dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Storage rooted at the platform data directory.
    pub fn default_location() -> Result<Self> {
        let base = dirs::data_dir().context("no platform data directory available")?;
        Self::new(base.join("campus-portal"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are ASCII identifiers; anything else is flattened defensively
        // so a key can never escape the storage dir.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(safe)
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        let path = self.path_for(key);
        let temp = path.with_extension("tmp");
        let result = std::fs::write(&temp, value).and_then(|_| std::fs::rename(&temp, &path));
        if let Err(err) = result {
            tracing::warn!("storage: failed to write key {}: {}", key, err);
        }
    }

    fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }
}
