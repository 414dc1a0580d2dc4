//! Remote media provider seam.
//!
//! The broker talks to the generative service through the
//! [`MediaProvider`] trait, so the transport ([`GeminiProvider`] in
//! production, a scripted stub in tests) is swappable without touching
//! queue, retry, or fallback logic. Providers classify failures into the
//! structured [`ShowreelError`](crate::ShowreelError) taxonomy — callers
//! never inspect error text.

mod gemini;
pub mod retry;

pub use gemini::GeminiProvider;
pub use retry::RetryConfig;

use async_trait::async_trait;

use crate::Result;
use crate::types::AspectRatio;

/// A remote generative-media service.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Generate a single still image for `prompt`.
    ///
    /// Returns the encoded payload as a `data:` URI string.
    async fn generate_image(&self, prompt: &str, aspect: AspectRatio) -> Result<String>;

    /// Generate a short narration for `text`.
    ///
    /// Returns the encoded audio as a raw base64 string.
    async fn generate_speech(&self, text: &str) -> Result<String>;
}
