//! Content-addressed media cache.
//!
//! Maps a digest of (prompt, output format) to the media payload the
//! remote service produced for it. Two tiers:
//!
//! - a moka hot tier for repeat lookups within a session, and
//! - a durable [`KeyValueStore`](crate::store::KeyValueStore) that
//!   survives restarts.
//!
//! # Keying
//!
//! Keys are a versioned namespace prefix plus a truncated SHA-256 digest
//! of the normalized inputs, so identical requests always collide and
//! distinct requests never collide in practice. SHA-256 (rather than the
//! process-local `DefaultHasher`) because the keys outlive the process.
//! The truncated-digest collision risk is accepted.
//!
//! # Lifecycle
//!
//! Entries are created on first successful resolution, never updated in
//! place, and never expire — a present entry is treated as fresh. The only
//! invalidation mechanism is bumping
//! [`CacheConfig::namespace_version`], which retires every prior entry at
//! once. When the durable backend rejects a write, the cache evicts its
//! entire namespace and retries the write exactly once; if that also
//! fails, the payload is dropped silently and the next request is a miss.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::store::KeyValueStore;
use crate::telemetry;
use crate::types::{AspectRatio, OutputFormat};

/// Configuration for the media cache.
///
/// ```rust
/// # use showreel::CacheConfig;
/// let config = CacheConfig::new()
///     .namespace_version(2)
///     .hot_capacity(512);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Namespace for image entries. Default: `showreel_img`.
    pub image_namespace: String,
    /// Namespace for audio entries. Default: `showreel_vo`.
    pub audio_namespace: String,
    /// Version segment folded into both prefixes. Bump to retire every
    /// previously cached payload at once. Default: 1.
    pub namespace_version: u32,
    /// Maximum entries in the in-memory hot tier. Default: 256.
    pub hot_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            image_namespace: "showreel_img".to_owned(),
            audio_namespace: "showreel_vo".to_owned(),
            namespace_version: 1,
            hot_capacity: 256,
        }
    }
}

impl CacheConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace version.
    pub fn namespace_version(mut self, version: u32) -> Self {
        self.namespace_version = version;
        self
    }

    /// Set the hot-tier capacity.
    pub fn hot_capacity(mut self, capacity: u64) -> Self {
        self.hot_capacity = capacity;
        self
    }

    /// Full key prefix for image entries.
    pub fn image_prefix(&self) -> String {
        format!("{}_v{}_", self.image_namespace, self.namespace_version)
    }

    /// Full key prefix for audio entries.
    pub fn audio_prefix(&self) -> String {
        format!("{}_v{}_", self.audio_namespace, self.namespace_version)
    }
}

/// Two-tier content-addressed cache for resolved media payloads.
///
/// Cheap to clone — the hot tier and the store handle are shared.
#[derive(Clone)]
pub struct MediaCache {
    store: Arc<dyn KeyValueStore>,
    hot: moka::sync::Cache<String, String>,
    config: CacheConfig,
}

impl MediaCache {
    /// Create a cache over the given durable store.
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        let hot = moka::sync::Cache::new(config.hot_capacity);
        Self { store, hot, config }
    }

    /// Cache key for an image request.
    pub fn image_key(&self, prompt: &str, aspect: AspectRatio) -> String {
        self.key(prompt, OutputFormat::Image(aspect))
    }

    /// Cache key for a voiceover request.
    pub fn audio_key(&self, text: &str) -> String {
        self.key(text, OutputFormat::Audio)
    }

    /// Cache key for an arbitrary (content, format) pair.
    pub fn key(&self, content: &str, format: OutputFormat) -> String {
        let prefix = match format {
            OutputFormat::Image(_) => self.config.image_prefix(),
            OutputFormat::Audio => self.config.audio_prefix(),
        };
        format!("{}{}", prefix, digest16(content, format.descriptor()))
    }

    /// Look up a payload. Never fails — storage errors read as a miss.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(payload) = self.hot.get(key) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => "hot").increment(1);
            return Some(payload);
        }
        if let Some(payload) = self.store.get(key) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => "durable").increment(1);
            self.hot.insert(key.to_owned(), payload.clone());
            return Some(payload);
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        None
    }

    /// Write a payload through both tiers. Best-effort: on a durable-store
    /// failure the whole namespace is evicted and the write retried once;
    /// a second failure drops the payload.
    pub fn put(&self, key: &str, payload: &str) {
        self.hot.insert(key.to_owned(), payload.to_owned());

        if let Err(first) = self.store.set(key, payload) {
            warn!(error = %first, "cache write failed, evicting namespace");
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
            self.store.delete_by_prefix(&self.config.image_prefix());
            self.store.delete_by_prefix(&self.config.audio_prefix());

            if let Err(second) = self.store.set(key, payload) {
                warn!(error = %second, "cache write failed after eviction, dropping payload");
            }
        }
    }

    /// Evict everything this cache owns: the hot tier and both durable
    /// namespaces.
    pub fn clear(&self) {
        self.hot.invalidate_all();
        let removed = self.store.delete_by_prefix(&self.config.image_prefix())
            + self.store.delete_by_prefix(&self.config.audio_prefix());
        debug!(removed, "cleared media cache");
    }
}

/// First 16 hex chars of SHA-256 over the content and format descriptor.
///
/// A unit separator keeps `("ab", "c")` and `("a", "bc")` distinct.
fn digest16(content: &str, descriptor: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update([0x1f]);
    hasher.update(descriptor.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_owned()
}
