//! Builder for configuring broker instances.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use super::MediaBroker;
use super::fallback::FallbackConfig;
use crate::cache::{CacheConfig, MediaCache};
use crate::provider::{GeminiProvider, MediaProvider, RetryConfig};
use crate::queue::{QueueConfig, RequestQueue};
use crate::store::{FileStore, KeyValueStore, MemoryStore};

/// Main entry point for creating broker instances.
pub struct Showreel;

impl Showreel {
    /// Create a new builder for configuring the broker.
    pub fn builder() -> ShowreelBuilder {
        ShowreelBuilder::new()
    }
}

/// Builder for configuring broker instances.
pub struct ShowreelBuilder {
    gemini_key: Option<String>,
    provider: Option<Arc<dyn MediaProvider>>,
    store: Option<Arc<dyn KeyValueStore>>,
    cache_dir: Option<PathBuf>,
    in_memory: bool,
    cache: CacheConfig,
    queue: QueueConfig,
    retry: RetryConfig,
    fallback: FallbackConfig,
    timeout_secs: Option<u64>,
}

impl ShowreelBuilder {
    pub fn new() -> Self {
        Self {
            gemini_key: None,
            provider: None,
            store: None,
            cache_dir: None,
            in_memory: false,
            cache: CacheConfig::default(),
            queue: QueueConfig::default(),
            retry: RetryConfig::default(),
            fallback: FallbackConfig::default(),
            timeout_secs: None,
        }
    }

    /// Configure the Gemini provider with an API key.
    pub fn gemini(mut self, api_key: impl Into<String>) -> Self {
        self.gemini_key = Some(api_key.into());
        self
    }

    /// Use a custom media provider (takes precedence over [`gemini`](Self::gemini)).
    pub fn provider(mut self, provider: Arc<dyn MediaProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use a custom durable store.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Persist the cache under `dir` instead of the default location.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Keep the cache in memory only (nothing survives the process).
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    /// Set the cache configuration.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Set the queue configuration.
    pub fn queue(mut self, config: QueueConfig) -> Self {
        self.queue = config;
        self
    }

    /// Set the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Set the fallback-ladder configuration.
    pub fn fallback(mut self, config: FallbackConfig) -> Self {
        self.fallback = config;
        self
    }

    /// Set the per-attempt timeout for the built-in Gemini provider
    /// (seconds). Ignored when a custom provider is supplied.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Pull missing settings from the environment: `GEMINI_API_KEY` for
    /// credentials. (The default cache directory already honours
    /// `SHOWREEL_CACHE_DIR`.)
    pub fn from_env(mut self) -> Self {
        if self.gemini_key.is_none()
            && let Ok(key) = std::env::var("GEMINI_API_KEY")
            && !key.is_empty()
        {
            self.gemini_key = Some(key);
        }
        self
    }

    /// Build the broker.
    ///
    /// Construction cannot fail: every misconfiguration degrades instead,
    /// per the facade's never-throws contract. With no credentials the
    /// broker resolves every request to `None` without a remote call;
    /// with no usable cache directory it falls back to an in-memory
    /// store.
    pub fn build(self) -> MediaBroker {
        let provider: Option<Arc<dyn MediaProvider>> = match (self.provider, self.gemini_key) {
            (Some(provider), _) => Some(provider),
            (None, Some(key)) => {
                let mut provider = GeminiProvider::new(key);
                if let Some(secs) = self.timeout_secs {
                    provider = provider.timeout_secs(secs);
                }
                Some(Arc::new(provider))
            }
            (None, None) => {
                warn!("no credentials configured, media requests will resolve to nothing");
                None
            }
        };

        let store: Arc<dyn KeyValueStore> = if let Some(store) = self.store {
            store
        } else if self.in_memory {
            Arc::new(MemoryStore::new())
        } else {
            let dir = self.cache_dir.unwrap_or_else(FileStore::default_dir);
            match FileStore::new(&dir) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(error = %e, dir = %dir.display(), "cache directory unavailable, using in-memory store");
                    Arc::new(MemoryStore::new())
                }
            }
        };

        MediaBroker::new(
            provider,
            MediaCache::new(store, self.cache),
            RequestQueue::new(self.queue),
            self.retry,
            self.fallback,
        )
    }
}

impl Default for ShowreelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
