//! Showreel - rate-limited request broker for generative media APIs
//!
//! Many independent page widgets each want one cinematic image (or a
//! short narrated voice-over) from a remote generative service that
//! enforces strict quotas. This crate turns that uncoordinated,
//! concurrent demand into a safe stream of calls:
//!
//! - a persistent **content-addressed cache**, so identical requests hit
//!   the remote service at most once across sessions;
//! - a **serialized queue** issuing one call at a time with a minimum
//!   spacing, plus a **circuit breaker** that pauses everything after a
//!   quota-exhaustion signal;
//! - bounded exponential-backoff **retry** on transient failures;
//! - a **fallback ladder** that degrades prompt specificity before
//!   giving up.
//!
//! The facade never errors: every failure mode resolves to `None`, and
//! callers render a placeholder.
//!
//! # Example
//!
//! ```rust,no_run
//! use showreel::{AspectRatio, MediaGateway, Showreel};
//!
//! #[tokio::main]
//! async fn main() {
//!     let broker = Showreel::builder()
//!         .from_env() // GEMINI_API_KEY
//!         .build();
//!
//!     let image = broker
//!         .generate_cinematic_image(
//!             "empty gallery at night, rain on the skylight",
//!             AspectRatio::Widescreen,
//!             false,
//!         )
//!         .await;
//!
//!     match image {
//!         Some(data_uri) => println!("got {} bytes of media", data_uri.len()),
//!         None => println!("rendering placeholder"),
//!     }
//! }
//! ```

pub mod broker;
pub mod cache;
pub mod error;
pub mod provider;
pub mod queue;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use broker::{FallbackConfig, MediaBroker, MediaGateway, MediaTicket, Showreel, ShowreelBuilder};
pub use cache::{CacheConfig, MediaCache};
pub use error::{Result, ShowreelError};
pub use provider::{GeminiProvider, MediaProvider, RetryConfig};
pub use queue::{CircuitState, QueueConfig, RequestQueue, Ticket};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreWriteError};
pub use types::{AspectRatio, OutputFormat};
