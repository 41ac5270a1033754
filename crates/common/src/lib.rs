//! ChronoSketch Common Utilities
//!
//! Shared infrastructure for all ChronoSketch crates:
//! - Error types and result aliases
//! - Wall-clock and monotonic clocks for stroke timestamps
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
