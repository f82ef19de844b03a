//! # Mirror Utilities
//!
//! Shared utilities and logging for mirror.
//!
//! This crate provides the logging setup used by the `mirror` binary, built
//! on `tracing`. The core library only emits events; installing a subscriber
//! is left to whichever binary links it.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
