//! Durable key-value storage.
//!
//! The media cache persists payloads through the minimal [`KeyValueStore`]
//! trait so the backend is swappable without touching broker logic:
//!
//! - [`FileStore`] — one file per key under a root directory; survives
//!   process restarts. The production backend.
//! - [`MemoryStore`] — mutex-guarded map for tests and ephemeral use.
//!
//! # Failure model
//!
//! Reads never fail: a backend that cannot read simply reports absence.
//! Writes report capacity/IO failure so the cache can evict its namespace
//! and retry once. Bulk eviction is a key-prefix scan — there is no
//! manifest or index.

use std::collections::HashMap;
use std::sync::Mutex;

mod file;

pub use file::FileStore;

/// Error raised by a failed store write.
#[derive(Debug, thiserror::Error)]
#[error("store write failed: {0}")]
pub struct StoreWriteError(pub String);

/// Minimal key-value persistence contract for cached media payloads.
pub trait KeyValueStore: Send + Sync {
    /// Look up a value. Backend failures read as absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value. Capacity or IO failures are reported so the caller
    /// can evict and retry.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreWriteError>;

    /// Remove every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    fn delete_by_prefix(&self, prefix: &str) -> usize;
}

/// In-memory store backed by a mutex-guarded map.
///
/// The optional capacity cap (total stored bytes) makes the cache's
/// evict-and-retry path exercisable in tests — the analogue of a browser
/// storage quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryStore {
    /// Create an unbounded in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once the total stored bytes
    /// (keys + values) would exceed `capacity_bytes`.
    pub fn with_capacity_bytes(capacity_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().expect("memory store lock poisoned")
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreWriteError> {
        let mut entries = self.lock();
        if let Some(cap) = self.capacity_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > cap {
                return Err(StoreWriteError(format!(
                    "capacity exceeded ({cap} bytes)"
                )));
            }
        }
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        before - entries.len()
    }
}
