//! Prompt fallback ladder.
//!
//! The exact artistic prompt may be rejected by content filters or fail
//! for reasons unrelated to quota. Rather than surface nothing, the
//! ladder re-attempts with progressively more generic, lower-risk
//! prompts — trading specificity for success probability. For a visual
//! product page, *some* image beats prompt fidelity.
//!
//! Tiers, in order:
//!
//! 1. the exact requested prompt and aspect, with the full retry budget;
//! 2. a content-neutral generic prompt in the default aspect, with a
//!    reduced retry budget;
//! 3. a near-trivial minimal prompt, single attempt, no retries.
//!
//! Any error escalates to the next tier (transient errors first exhaust
//! the tier's retry budget). The error of the last tier propagates so
//! the queue can still observe a quota signal; the facade maps every
//! error to an absence.

use tracing::warn;

use crate::provider::retry::with_retry;
use crate::provider::{MediaProvider, RetryConfig};
use crate::telemetry;
use crate::types::AspectRatio;
use crate::Result;

/// Configuration for the fallback ladder.
///
/// ```rust
/// # use showreel::FallbackConfig;
/// let config = FallbackConfig::new()
///     .generic_prompt("Soft spotlight on an empty stage")
///     .minimal_prompt("Light on a dark wall");
/// ```
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    /// Content-neutral prompt for the second tier.
    pub generic_prompt: String,
    /// Aspect ratio used by the degraded tiers.
    pub generic_aspect: AspectRatio,
    /// Near-trivial prompt for the last-resort tier.
    pub minimal_prompt: String,
    /// Attempt budget for the generic tier (including the initial
    /// request). Default: 2 — one fewer retry than the primary default.
    pub generic_max_attempts: u32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            generic_prompt:
                "Abstract interplay of light and shadow on a dark stage, soft atmospheric haze"
                    .to_owned(),
            generic_aspect: AspectRatio::Widescreen,
            minimal_prompt: "A single beam of light in darkness".to_owned(),
            generic_max_attempts: 2,
        }
    }
}

impl FallbackConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the generic-tier prompt.
    pub fn generic_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.generic_prompt = prompt.into();
        self
    }

    /// Set the aspect ratio used by the degraded tiers.
    pub fn generic_aspect(mut self, aspect: AspectRatio) -> Self {
        self.generic_aspect = aspect;
        self
    }

    /// Set the minimal-tier prompt.
    pub fn minimal_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.minimal_prompt = prompt.into();
        self
    }

    /// Set the generic-tier attempt budget.
    pub fn generic_max_attempts(mut self, attempts: u32) -> Self {
        self.generic_max_attempts = attempts;
        self
    }
}

/// Run the ladder for an image request.
///
/// Returns the first tier's payload that resolves; if every tier fails,
/// the last tier's error propagates.
pub(crate) async fn generate_with_fallback(
    provider: &dyn MediaProvider,
    retry: &RetryConfig,
    fallback: &FallbackConfig,
    prompt: &str,
    aspect: AspectRatio,
) -> Result<String> {
    let primary = with_retry(retry, provider.name(), "image", || {
        provider.generate_image(prompt, aspect)
    })
    .await;
    let err = match primary {
        Ok(payload) => return Ok(payload),
        Err(e) => e,
    };

    warn!(error = %err, "primary prompt failed, degrading to generic tier");
    metrics::counter!(telemetry::FALLBACK_ESCALATIONS_TOTAL, "tier" => "generic").increment(1);

    let reduced = retry.clone().max_attempts(fallback.generic_max_attempts);
    let generic = with_retry(&reduced, provider.name(), "image", || {
        provider.generate_image(&fallback.generic_prompt, fallback.generic_aspect)
    })
    .await;
    let err = match generic {
        Ok(payload) => return Ok(payload),
        Err(e) => e,
    };

    warn!(error = %err, "generic prompt failed, degrading to minimal tier");
    metrics::counter!(telemetry::FALLBACK_ESCALATIONS_TOTAL, "tier" => "minimal").increment(1);

    provider
        .generate_image(&fallback.minimal_prompt, fallback.generic_aspect)
        .await
}
