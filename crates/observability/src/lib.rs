//! Tracing and logging (shared setup).

/// Tracing configuration (filters, output formats).
pub mod tracing;

pub use tracing::{LogFormat, init_with};
