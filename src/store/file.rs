//! File-backed key-value store.
//!
//! One file per key under a root directory. Cache keys are digest-based
//! (`[A-Za-z0-9_]` only) so the key doubles as the file name; anything
//! else is mapped to `_` before touching the filesystem. A prefix scan is
//! a directory scan.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use super::{KeyValueStore, StoreWriteError};

/// Durable store writing one file per key.
///
/// The durable analogue of browser local storage: payloads survive
/// process restarts, and a namespace can be retired wholesale with a
/// prefix delete.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Default store location: `SHOWREEL_CACHE_DIR` if set, otherwise the
    /// platform cache directory, otherwise a relative `.cache` directory.
    pub fn default_dir() -> PathBuf {
        std::env::var("SHOWREEL_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::cache_dir()
                    .unwrap_or_else(|| PathBuf::from(".cache"))
                    .join("showreel")
            })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn file_name(key: &str) -> String {
        key.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.root.join(Self::file_name(key))).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreWriteError> {
        fs::write(self.root.join(Self::file_name(key)), value)
            .map_err(|e| StoreWriteError(e.to_string()))
    }

    fn delete_by_prefix(&self, prefix: &str) -> usize {
        let prefix = Self::file_name(prefix);
        let Ok(entries) = fs::read_dir(&self.root) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(&prefix) && fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(prefix = %prefix, removed, "purged store namespace");
        }
        removed
    }
}
