//! Logging utilities.
//!
//! The engine logs through the `log` facade only. This module owns the one-time
//! `env_logger` setup used by binaries and tests.

mod init;

pub use init::{init_logging, LoggingConfig};
