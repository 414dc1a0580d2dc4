//! Telemetry metric name constants.
//!
//! Centralised metric names for showreel operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `showreel_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `provider` — provider name (e.g. "gemini")
//! - `operation` — operation invoked ("image" | "voiceover")
//! - `tier` — fallback tier or cache tier, depending on the metric

/// Total requests admitted at the facade.
///
/// Labels: `operation`.
pub const REQUESTS_TOTAL: &str = "showreel_requests_total";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`, `operation`.
pub const RETRIES_TOTAL: &str = "showreel_retries_total";

/// Total cache hits.
///
/// Labels: `tier` ("hot" | "durable").
pub const CACHE_HITS_TOTAL: &str = "showreel_cache_hits_total";

/// Total cache misses.
pub const CACHE_MISSES_TOTAL: &str = "showreel_cache_misses_total";

/// Total bulk namespace evictions triggered by failed cache writes.
pub const CACHE_EVICTIONS_TOTAL: &str = "showreel_cache_evictions_total";

/// Total circuit-breaker trips (quota exhaustion observed by the queue).
pub const CIRCUIT_TRIPS_TOTAL: &str = "showreel_circuit_trips_total";

/// Total enqueue attempts rejected because the circuit was open.
pub const QUEUE_REJECTIONS_TOTAL: &str = "showreel_queue_rejections_total";

/// Total fallback-ladder escalations.
///
/// Labels: `tier` — the tier escalated *to* ("generic" | "minimal").
pub const FALLBACK_ESCALATIONS_TOTAL: &str = "showreel_fallback_escalations_total";
