//! Broker facade combining cache, queue, retry, and fallback.
//!
//! The one public surface widgets consume. Data flows one direction:
//!
//! ```text
//! Widget ──► Facade ──► Cache (read) ──► [miss] ──► Queue ──► Retry/Fallback
//!                                                                  │
//! Widget ◄── Facade ◄───────── Cache (write) ◄──────────── Remote Service
//! ```
//!
//! # Failure contract
//!
//! Nothing above this boundary ever observes an error: every failure
//! mode — exhausted fallback tiers, an open circuit, missing
//! credentials, storage trouble — degrades to `None`, and widgets render
//! a placeholder. Results are idempotent with respect to caching: the
//! same input yields the same payload once cached, with no further
//! remote calls.

mod builder;
mod fallback;

pub use builder::{Showreel, ShowreelBuilder};
pub use fallback::FallbackConfig;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::MediaCache;
use crate::provider::retry::with_retry;
use crate::provider::{MediaProvider, RetryConfig};
use crate::queue::{RequestQueue, Ticket};
use crate::telemetry;
use crate::types::AspectRatio;
use fallback::generate_with_fallback;

/// Widget-facing operations.
///
/// Abstracts over [`MediaBroker`] so consumers and tests can substitute
/// doubles. Both operations resolve to `None` rather than erroring.
#[async_trait]
pub trait MediaGateway: Send + Sync {
    /// Resolve a cinematic still for `prompt`, or `None`.
    async fn generate_cinematic_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
        priority: bool,
    ) -> Option<String>;

    /// Resolve a short narration for `text`, or `None`.
    async fn generate_trailer_voiceover(&self, text: &str) -> Option<String>;
}

/// Handle to an in-flight media request.
///
/// Widgets that unmount before resolution call [`cancel()`](Self::cancel)
/// and drop the handle; a request already past the cache (queued) is then
/// discarded before it consumes a remote-call attempt.
pub struct MediaTicket {
    state: TicketState,
}

enum TicketState {
    /// Resolved at admission: cache hit, missing credentials, or circuit
    /// rejection.
    Ready(Option<String>),
    Queued {
        ticket: Ticket<String>,
        cache: MediaCache,
        key: String,
    },
}

impl MediaTicket {
    fn ready(payload: Option<String>) -> Self {
        Self {
            state: TicketState::Ready(payload),
        }
    }

    /// Abandon the request. Cooperative — a task already executing runs
    /// to completion and its result is simply discarded.
    pub fn cancel(&self) {
        if let TicketState::Queued { ticket, .. } = &self.state {
            ticket.cancel();
        }
    }

    /// Wait for the request to resolve. Successful payloads are written
    /// through to the cache on the way out.
    pub async fn resolve(self) -> Option<String> {
        match self.state {
            TicketState::Ready(payload) => payload,
            TicketState::Queued { ticket, cache, key } => match ticket.resolve().await {
                Ok(payload) => {
                    cache.put(&key, &payload);
                    Some(payload)
                }
                Err(e) => {
                    debug!(error = %e, "media request resolved without payload");
                    None
                }
            },
        }
    }
}

/// The media-request broker: cache lookup → queue admission → retry →
/// fallback → cache write.
///
/// Construct via [`Showreel::builder()`].
pub struct MediaBroker {
    provider: Option<Arc<dyn MediaProvider>>,
    cache: MediaCache,
    queue: RequestQueue,
    retry: RetryConfig,
    fallback: FallbackConfig,
}

impl MediaBroker {
    pub(crate) fn new(
        provider: Option<Arc<dyn MediaProvider>>,
        cache: MediaCache,
        queue: RequestQueue,
        retry: RetryConfig,
        fallback: FallbackConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            queue,
            retry,
            fallback,
        }
    }

    /// Begin an image request, returning a cancellable handle.
    ///
    /// `priority` jumps the queue (insertion at the head, no preemption
    /// of a running task).
    pub fn request_cinematic_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
        priority: bool,
    ) -> MediaTicket {
        let Some(provider) = self.provider.clone() else {
            warn!("no media provider configured, skipping image generation");
            return MediaTicket::ready(None);
        };
        metrics::counter!(telemetry::REQUESTS_TOTAL, "operation" => "image").increment(1);

        let key = self.cache.image_key(prompt, aspect);
        if let Some(hit) = self.cache.get(&key) {
            return MediaTicket::ready(Some(hit));
        }

        let retry = self.retry.clone();
        let fallback = self.fallback.clone();
        let prompt = prompt.to_owned();
        let job = async move {
            generate_with_fallback(provider.as_ref(), &retry, &fallback, &prompt, aspect).await
        };

        match self.queue.enqueue(job, priority) {
            Ok(ticket) => MediaTicket {
                state: TicketState::Queued {
                    ticket,
                    cache: self.cache.clone(),
                    key,
                },
            },
            Err(e) => {
                debug!(error = %e, "image request rejected at admission");
                MediaTicket::ready(None)
            }
        }
    }

    /// Begin a voiceover request, returning a cancellable handle.
    ///
    /// No fallback ladder — the narration either succeeds (within the
    /// retry policy) or is omitted.
    pub fn request_trailer_voiceover(&self, text: &str) -> MediaTicket {
        let Some(provider) = self.provider.clone() else {
            warn!("no media provider configured, skipping voiceover generation");
            return MediaTicket::ready(None);
        };
        metrics::counter!(telemetry::REQUESTS_TOTAL, "operation" => "voiceover").increment(1);

        let key = self.cache.audio_key(text);
        if let Some(hit) = self.cache.get(&key) {
            return MediaTicket::ready(Some(hit));
        }

        let retry = self.retry.clone();
        let text = text.to_owned();
        let job = async move {
            with_retry(&retry, provider.name(), "voiceover", || {
                provider.generate_speech(&text)
            })
            .await
        };

        match self.queue.enqueue(job, false) {
            Ok(ticket) => MediaTicket {
                state: TicketState::Queued {
                    ticket,
                    cache: self.cache.clone(),
                    key,
                },
            },
            Err(e) => {
                debug!(error = %e, "voiceover request rejected at admission");
                MediaTicket::ready(None)
            }
        }
    }

    /// The queue shared by every request through this broker.
    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }
}

#[async_trait]
impl MediaGateway for MediaBroker {
    async fn generate_cinematic_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
        priority: bool,
    ) -> Option<String> {
        self.request_cinematic_image(prompt, aspect, priority)
            .resolve()
            .await
    }

    async fn generate_trailer_voiceover(&self, text: &str) -> Option<String> {
        self.request_trailer_voiceover(text).resolve().await
    }
}
