//! Logging utilities.
//!
//! Shader diagnostics go through the `log` facade; this module only wires up
//! `env_logger` for binaries and tests that want to see them.

mod init;

pub use init::{init_logging, LoggingConfig};
