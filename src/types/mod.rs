//! Public types for the Showreel API.

mod format;

pub use format::{AspectRatio, OutputFormat};
